//! Repository adapter persisting the data set to one JSON file.

use super::{DataSet, MemoryRepository, SanctionRepository};
use crate::model::{
    ClubSanction, Collection, NewClubSanction, NewPersonalSanction, PersonalSanction, User,
};
use crate::{Result, SisaeError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// [`MemoryRepository`] whose contents are written back to `path` on
/// every mutation
///
/// A mutation becomes visible only after the data file has been replaced, so
/// a failed write leaves both the file and the live state unchanged.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    inner: MemoryRepository,
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Open the data file, treating a missing file as an empty data set
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<DataSet>(&bytes).map_err(|e| {
                SisaeError::repository(format!(
                    "Data file {} is not valid: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => DataSet::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            inner: MemoryRepository::with_data(data),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a user account and persist it
    pub async fn add_user(&self, user: User) -> Result<()> {
        self.commit(|data| data.users.push(user)).await
    }

    /// Apply `change` to a copy of the data set, write the copy to disk and
    /// only then make it live
    async fn commit<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut DataSet) -> T + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut data = self.inner.data()?;
        let output = change(&mut data);
        self.write_file(&data).await?;
        self.inner.replace(data)?;
        Ok(output)
    }

    /// Write `data` to disk via a temporary file and rename
    async fn write_file(&self, data: &DataSet) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(data)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await.map_err(|e| {
            SisaeError::repository(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            SisaeError::repository(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Data file written");
        Ok(())
    }
}

#[async_trait]
impl SanctionRepository for JsonFileRepository {
    async fn club_sanctions(&self) -> Result<Vec<ClubSanction>> {
        self.inner.club_sanctions().await
    }

    async fn personal_sanctions(&self) -> Result<Vec<PersonalSanction>> {
        self.inner.personal_sanctions().await
    }

    async fn users(&self) -> Result<Vec<User>> {
        self.inner.users().await
    }

    async fn max_sequence(&self, collection: Collection) -> Result<Option<u32>> {
        self.inner.max_sequence(collection).await
    }

    async fn insert_club_sanction(
        &self,
        sanction: NewClubSanction,
        numero_carga: u32,
    ) -> Result<ClubSanction> {
        self.commit(|data| data.insert_club(sanction, numero_carga))
            .await
    }

    async fn insert_personal_sanction(
        &self,
        sanction: NewPersonalSanction,
        numero_carga: u32,
    ) -> Result<PersonalSanction> {
        self.commit(|data| data.insert_personal(sanction, numero_carga))
            .await
    }

    async fn mark_personal_sanctions_reported(&self, ids: Vec<String>) -> Result<()> {
        self.commit(|data| data.mark_reported(&ids)).await
    }

    async fn clear_sanctions(&self) -> Result<()> {
        self.commit(DataSet::clear_sanctions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn club() -> NewClubSanction {
        NewClubSanction {
            nombre_sancionado: "Club Central".to_string(),
            deporte: "Rugby".to_string(),
            ubicacion: "Jesús María".to_string(),
            tipo_sancion: "Quita de puntos".to_string(),
            motivo_sancion: vec!["Alineación indebida".to_string()],
            fecha_inicio: "2024-04-01".to_string(),
            fecha_fin: "2024-04-30".to_string(),
            observaciones: Some("Primera instancia".to_string()),
            acta_pdf: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::open(temp_dir.path().join("data.json"))
            .await
            .unwrap();
        assert!(repo.club_sanctions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("data.json");

        let repo = JsonFileRepository::open(&path).await.unwrap();
        let inserted = repo.insert_club_sanction(club(), 12).await.unwrap();
        drop(repo);

        let reopened = JsonFileRepository::open(&path).await.unwrap();
        let records = reopened.club_sanctions().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], inserted);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let err = JsonFileRepository::open(&path).await.unwrap_err();
        assert!(matches!(err, SisaeError::Repository(_)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        let repo = JsonFileRepository::open(&path).await.unwrap();
        repo.insert_club_sanction(club(), 1).await.unwrap();

        // A directory where the temporary file should go makes the write fail
        let tmp = temp_dir.path().join("data.json.tmp");
        std::fs::create_dir(&tmp).unwrap();

        let err = repo.insert_club_sanction(club(), 5).await.unwrap_err();
        assert!(matches!(err, SisaeError::Repository(_)));
        assert!(repo.clear_sanctions().await.is_err());

        let live = repo.club_sanctions().await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].numero_carga, 1);

        std::fs::remove_dir(&tmp).unwrap();
        repo.insert_club_sanction(club(), 2).await.unwrap();
        drop(repo);

        let reopened = JsonFileRepository::open(&path).await.unwrap();
        let numbers: Vec<u32> = reopened
            .club_sanctions()
            .await
            .unwrap()
            .iter()
            .map(|s| s.numero_carga)
            .collect();
        assert_eq!(numbers, vec![2, 1]);
    }
}
