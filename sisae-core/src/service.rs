/*!
Backup service facade.

`BackupService` is the single entry point the routing layer and the CLI talk
to. Build it once at process start, wrap it in an `Arc` and hand it to
whoever needs it. Backup creation and restore are serialized through one
lock so a scheduled backup can never interleave with a restore.
*/

use crate::clock::{Clock, SystemClock};
use crate::config::BackupConfig;
use crate::repository::SanctionRepository;
use crate::restore::{RestoreOrchestrator, RestoreOutcome};
use crate::scheduler::{BackupScheduler, SchedulerHandle};
use crate::sequence::SequenceAllocator;
use crate::snapshot::{Snapshot, SnapshotEntry};
use crate::storage::{BackupStorage, LocalBackupStorage};
use crate::store::SnapshotStore;
use crate::Result;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Listing entry with the display fields the dashboard shows
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupListing {
    pub file_name: String,
    pub date: String,
    pub size: u64,
    /// `dd/mm/yyyy, HH:MM:SS` in the configured offset
    pub formatted_date: String,
    /// Whole kilobytes, e.g. `12 KB`
    pub formatted_size: String,
}

impl BackupListing {
    pub fn from_entry(entry: &SnapshotEntry, offset: &FixedOffset) -> Self {
        Self {
            file_name: entry.file_name.clone(),
            date: entry.date.to_rfc3339(),
            size: entry.size,
            formatted_date: entry
                .date
                .with_timezone(offset)
                .format("%d/%m/%Y, %H:%M:%S")
                .to_string(),
            formatted_size: format_kilobytes(entry.size),
        }
    }
}

/// Size in kilobytes rounded to the nearest whole number
pub fn format_kilobytes(bytes: u64) -> String {
    format!("{} KB", (bytes as f64 / 1024.0).round() as u64)
}

/// Create, list, inspect and restore backups of the live data set
pub struct BackupService<S, R: ?Sized> {
    config: BackupConfig,
    store: SnapshotStore<S, R>,
    clock: Arc<dyn Clock>,
    op_lock: Mutex<()>,
}

impl<R> BackupService<LocalBackupStorage, R>
where
    R: SanctionRepository + ?Sized,
{
    /// Service writing to `config.backup_dir` with the system clock
    pub fn from_config(config: BackupConfig, repository: Arc<R>) -> Result<Self> {
        let storage = LocalBackupStorage::new(&config.backup_dir);
        Self::new(config, storage, repository, Arc::new(SystemClock))
    }
}

impl<S, R> BackupService<S, R>
where
    S: BackupStorage,
    R: SanctionRepository + ?Sized,
{
    pub fn new(
        config: BackupConfig,
        storage: S,
        repository: Arc<R>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let offset = config.offset()?;
        Ok(Self {
            store: SnapshotStore::new(storage, repository, Arc::clone(&clock), offset),
            config,
            clock,
            op_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore<S, R> {
        &self.store
    }

    /// Record-number allocator over the live repository
    pub fn allocator(&self) -> SequenceAllocator<'_, R> {
        SequenceAllocator::new(&**self.store.repository())
    }

    /// Snapshot the live data set
    ///
    /// # Returns
    /// Location of the new snapshot file
    pub async fn create_backup(&self) -> Result<String> {
        let _guard = self.op_lock.lock().await;
        self.store.create().await
    }

    /// Stored snapshots, newest first
    pub async fn list_backups(&self) -> Vec<SnapshotEntry> {
        self.store.list().await
    }

    /// Stored snapshots with display fields, newest first
    pub async fn list_backups_formatted(&self) -> Vec<BackupListing> {
        let offset = self.store.offset();
        self.store
            .list()
            .await
            .iter()
            .map(|entry| BackupListing::from_entry(entry, &offset))
            .collect()
    }

    /// Contents of one snapshot, `None` when missing or unreadable
    pub async fn get_backup_data(&self, file_name: &str) -> Option<Snapshot> {
        self.store.read(file_name).await
    }

    /// Replace the live sanction data with the contents of `file_name`
    ///
    /// Callers must invalidate any caches of the sanction collections after
    /// a successful restore.
    pub async fn restore_from_backup(&self, file_name: &str) -> RestoreOutcome {
        let _guard = self.op_lock.lock().await;
        info!(file = %file_name, "Restore requested");
        RestoreOrchestrator::new(&self.store).restore(file_name).await
    }
}

impl<S, R> BackupService<S, R>
where
    S: BackupStorage + 'static,
    R: SanctionRepository + ?Sized + 'static,
{
    /// Start the daily automatic backup loop
    ///
    /// Runs one backup immediately, then one per day at the configured time.
    pub fn start_scheduler(self: &Arc<Self>) -> Result<SchedulerHandle> {
        let scheduler = BackupScheduler::new(
            self.config.schedule,
            self.config.offset()?,
            Arc::clone(&self.clock),
        );

        let service = Arc::clone(self);
        Ok(scheduler.spawn(move || {
            let service = Arc::clone(&service);
            Box::pin(async move { service.create_backup().await })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_format_kilobytes() {
        assert_eq!(format_kilobytes(0), "0 KB");
        assert_eq!(format_kilobytes(511), "0 KB");
        assert_eq!(format_kilobytes(512), "1 KB");
        assert_eq!(format_kilobytes(10 * 1024 + 100), "10 KB");
    }

    #[test]
    fn test_listing_display_fields() {
        let entry = SnapshotEntry {
            file_name: "backup_x.json".to_string(),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 17, 3, 7).unwrap(),
            size: 2048,
        };
        let listing = BackupListing::from_entry(&entry, &FixedOffset::west_opt(3 * 3600).unwrap());

        assert_eq!(listing.formatted_date, "01/05/2024, 14:03:07");
        assert_eq!(listing.formatted_size, "2 KB");
        assert_eq!(listing.date, "2024-05-01T17:03:07+00:00");
    }

    #[tokio::test]
    async fn test_service_create_list_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let config = BackupConfig::with_backup_dir(temp_dir.path().join("backups"));
        let service =
            BackupService::from_config(config, Arc::new(MemoryRepository::new())).unwrap();

        assert!(service.list_backups().await.is_empty());

        service.create_backup().await.unwrap();
        let listed = service.list_backups_formatted().await;
        assert_eq!(listed.len(), 1);
        assert!(listed[0].formatted_size.ends_with(" KB"));

        let data = service.get_backup_data(&listed[0].file_name).await.unwrap();
        assert_eq!(data.version, "1.0");
        assert!(service.get_backup_data("backup_missing.json").await.is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = BackupConfig::default();
        config.schedule.hour = 30;
        let result = BackupService::from_config(config, Arc::new(MemoryRepository::new()));
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_takes_initial_backup() {
        let temp_dir = TempDir::new().unwrap();
        let config = BackupConfig::with_backup_dir(temp_dir.path());
        let service = Arc::new(
            BackupService::from_config(config, Arc::new(MemoryRepository::new())).unwrap(),
        );

        let handle = service.start_scheduler().unwrap();
        // The initial backup runs before the first sleep; poll until it lands
        let mut listed = Vec::new();
        for _ in 0..100 {
            listed = service.list_backups().await;
            if !listed.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        handle.shutdown().await;

        assert_eq!(listed.len(), 1);
    }
}
