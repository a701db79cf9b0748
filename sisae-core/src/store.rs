/*!
Snapshot store: creates, enumerates, loads and evicts backup documents.
*/

use crate::clock::Clock;
use crate::config::RETENTION_LIMIT;
use crate::repository::SanctionRepository;
use crate::snapshot::{format_timestamp, Snapshot, SnapshotEntry};
use crate::storage::BackupStorage;
use crate::{Result, SisaeError};
use chrono::FixedOffset;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Durable, enumerable storage of snapshots of the live data set
pub struct SnapshotStore<S, R: ?Sized> {
    storage: S,
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl<S, R> SnapshotStore<S, R>
where
    S: BackupStorage,
    R: SanctionRepository + ?Sized,
{
    pub fn new(storage: S, repository: Arc<R>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            storage,
            repository,
            clock,
            offset,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Snapshot the live data set and apply the retention policy
    ///
    /// # Returns
    /// Location of the written snapshot file
    ///
    /// # Errors
    /// Data-access and write failures. Directory creation problems are only
    /// logged; eviction problems never fail the call.
    pub async fn create(&self) -> Result<String> {
        if let Err(e) = self.storage.ensure_ready().await {
            warn!("Could not prepare backup directory: {}", e);
        }

        let timestamp = format_timestamp(self.clock.now(), &self.offset);

        let club_sanctions = self.repository.club_sanctions().await?;
        let personal_sanctions = self.repository.personal_sanctions().await?;
        let users = self.repository.users().await?;

        let snapshot = Snapshot::capture(timestamp, &club_sanctions, &personal_sanctions, &users)?;
        let file_name = snapshot.file_name();
        let bytes = snapshot.to_json_bytes()?;

        let location = match self.storage.write(&file_name, &bytes).await {
            Ok(location) => location,
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::observability::SisaeMetrics::global().record_backup_failure();
                return Err(e);
            }
        };

        #[cfg(feature = "metrics")]
        crate::observability::SisaeMetrics::global().record_backup_created(bytes.len());

        info!(
            file = %file_name,
            club_sanctions = snapshot.statistics.total_club_sanctions,
            personal_sanctions = snapshot.statistics.total_personal_sanctions,
            users = snapshot.statistics.total_users,
            "Backup created"
        );

        self.evict_excess().await;
        Ok(location)
    }

    /// Stored snapshots, newest first
    ///
    /// Never fails: an unreadable or missing directory yields an empty list.
    pub async fn list(&self) -> Vec<SnapshotEntry> {
        match self.storage.list().await {
            Ok(mut entries) => {
                entries.sort_by(|a, b| {
                    b.date
                        .cmp(&a.date)
                        .then_with(|| b.file_name.cmp(&a.file_name))
                });
                entries
            }
            Err(e) => {
                error!("Error reading backup directory: {}", e);
                Vec::new()
            }
        }
    }

    /// Load and parse one snapshot
    ///
    /// # Errors
    /// * `SisaeError::NotFound` - no snapshot with that name
    /// * `SisaeError::InvalidFormat` - the file exists but is not a snapshot
    pub async fn load(&self, file_name: &str) -> Result<Snapshot> {
        let bytes = self
            .storage
            .read(file_name)
            .await?
            .ok_or_else(|| SisaeError::not_found(file_name))?;

        Snapshot::from_json_bytes(&bytes)
            .map_err(|e| SisaeError::invalid_format(format!("{file_name}: {e}")))
    }

    /// Load one snapshot, logging and returning `None` when it cannot be used
    pub async fn read(&self, file_name: &str) -> Option<Snapshot> {
        match self.load(file_name).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!("Error reading backup file: {}", e);
                None
            }
        }
    }

    /// Delete every snapshot beyond the newest [`RETENTION_LIMIT`]
    ///
    /// Individual deletion failures are logged and skipped.
    ///
    /// # Returns
    /// Names of the snapshots actually deleted
    pub async fn evict_excess(&self) -> Vec<String> {
        let entries = self.list().await;
        if entries.len() <= RETENTION_LIMIT {
            return Vec::new();
        }

        let mut evicted = Vec::new();
        for entry in entries.into_iter().skip(RETENTION_LIMIT) {
            match self.storage.delete(&entry.file_name).await {
                Ok(()) => {
                    debug!(file = %entry.file_name, "Evicted old backup");
                    evicted.push(entry.file_name);
                }
                Err(e) => error!("Error cleaning old backup {}: {}", entry.file_name, e),
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::User;
    use crate::repository::MemoryRepository;
    use crate::snapshot::REDACTED_PASSWORD;
    use crate::storage::LocalBackupStorage;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn store_in(
        dir: &std::path::Path,
        repo: Arc<MemoryRepository>,
    ) -> SnapshotStore<LocalBackupStorage, MemoryRepository> {
        let clock = ManualClock::starting_at(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            chrono::Duration::seconds(1),
        );
        SnapshotStore::new(
            LocalBackupStorage::new(dir),
            repo,
            Arc::new(clock),
            FixedOffset::west_opt(3 * 3600).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_writes_named_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(MemoryRepository::new());
        repo.add_user(User {
            id: "u1".to_string(),
            username: "admin".to_string(),
            password: "$argon2id$hash".to_string(),
            role: "admin".to_string(),
            is_active: true,
            temporary_access: false,
            access_expires: None,
            last_login: None,
            created_at: None,
            created_by: None,
        })
        .unwrap();
        let store = store_in(&temp_dir.path().join("backups"), repo);

        let location = store.create().await.unwrap();
        assert!(location.ends_with("backup_2024-05-01T09-00-00-000-03-00.json"));

        let snapshot = store
            .read("backup_2024-05-01T09-00-00-000-03-00.json")
            .await
            .unwrap();
        assert_eq!(snapshot.timestamp, "2024-05-01T09:00:00.000-03:00");
        assert_eq!(snapshot.users[0]["password"], REDACTED_PASSWORD);
        assert_eq!(snapshot.statistics.total_users, 1);
    }

    #[tokio::test]
    async fn test_retention_keeps_newest_ten() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(temp_dir.path(), Arc::new(MemoryRepository::new()));

        let mut created = Vec::new();
        for _ in 0..13 {
            let location = store.create().await.unwrap();
            created.push(
                std::path::Path::new(&location)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string(),
            );
        }

        let listed: Vec<String> = store.list().await.into_iter().map(|e| e.file_name).collect();
        assert_eq!(listed.len(), RETENTION_LIMIT);

        let mut expected: Vec<String> = created[3..].to_vec();
        expected.reverse();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_snapshots() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(temp_dir.path(), Arc::new(MemoryRepository::new()));

        let err = store.load("backup_nope.json").await.unwrap_err();
        assert!(err.is_not_found());

        std::fs::write(temp_dir.path().join("backup_bad.json"), "{ truncated").unwrap();
        let err = store.load("backup_bad.json").await.unwrap_err();
        assert!(matches!(err, SisaeError::InvalidFormat(_)));
        assert!(store.read("backup_bad.json").await.is_none());
    }

    #[tokio::test]
    async fn test_list_of_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(
            &temp_dir.path().join("absent"),
            Arc::new(MemoryRepository::new()),
        );
        assert!(store.list().await.is_empty());
        assert!(store.evict_excess().await.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_continues_past_delete_failure() {
        use crate::storage::MockBackupStorage;

        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let entries: Vec<SnapshotEntry> = (0..13)
            .map(|i| SnapshotEntry {
                file_name: format!("backup_{i:02}.json"),
                date: base + chrono::Duration::hours(i),
                size: 100,
            })
            .collect();

        let mut storage = MockBackupStorage::new();
        storage.expect_list().returning(move || Ok(entries.clone()));
        storage
            .expect_delete()
            .times(3)
            .returning(|name: &str| {
                if name == "backup_01.json" {
                    Err(SisaeError::storage("permission denied"))
                } else {
                    Ok(())
                }
            });

        let store = SnapshotStore::new(
            storage,
            Arc::new(MemoryRepository::new()),
            Arc::new(ManualClock::starting_at(base, chrono::Duration::zero())),
            FixedOffset::west_opt(3 * 3600).unwrap(),
        );

        let evicted = store.evict_excess().await;
        assert_eq!(evicted, vec!["backup_02.json", "backup_00.json"]);
    }
}
