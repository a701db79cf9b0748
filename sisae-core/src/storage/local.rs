/*!
Local filesystem storage adapter implementation.
*/

use super::{is_safe_file_name, BackupStorage};
use crate::snapshot::{is_backup_file_name, SnapshotEntry};
use crate::{Result, SisaeError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Local filesystem storage adapter
///
/// Stores every snapshot as a file directly inside `base_dir`. The directory
/// is created on first use.
///
/// # Example
/// ```rust,no_run
/// use sisae_core::storage::{BackupStorage, LocalBackupStorage};
///
/// # async fn demo() -> sisae_core::Result<()> {
/// let storage = LocalBackupStorage::new("./backups");
/// storage.write("backup_demo.json", b"{}").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackupStorage {
    base_dir: PathBuf,
}

impl LocalBackupStorage {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        is_safe_file_name(name).then(|| self.base_dir.join(name))
    }
}

#[async_trait]
impl BackupStorage for LocalBackupStorage {
    async fn ensure_ready(&self) -> Result<()> {
        match fs::create_dir_all(&self.base_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(SisaeError::storage(format!(
                "Failed to create directory {}: {}",
                self.base_dir.display(),
                e
            ))),
        }
    }

    async fn write(&self, name: &str, data: &[u8]) -> Result<String> {
        let path = self
            .resolve(name)
            .ok_or_else(|| SisaeError::storage(format!("Invalid backup file name: {name}")))?;

        fs::write(&path, data).await.map_err(|e| {
            SisaeError::storage(format!(
                "Failed to write backup to {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(path.display().to_string())
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SisaeError::storage(format!(
                "Failed to read backup from {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn list(&self) -> Result<Vec<SnapshotEntry>> {
        let mut dir = match fs::read_dir(&self.base_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_backup_file_name(&name) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                // Removed between read_dir and stat
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let date: DateTime<Utc> = metadata.modified()?.into();
            entries.push(SnapshotEntry {
                file_name: name,
                date,
                size: metadata.len(),
            });
        }

        debug!(count = entries.len(), dir = %self.base_dir.display(), "Listed backup files");
        Ok(entries)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self
            .resolve(name)
            .ok_or_else(|| SisaeError::storage(format!("Invalid backup file name: {name}")))?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SisaeError::storage(format!(
                "Failed to delete backup {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
