/*!
Storage adapters for backup files.

This module defines the storage abstraction (port) the snapshot store writes
through, and the local filesystem implementation (adapter). Names passed to
the adapter are bare snapshot file names, never paths.
*/

pub mod local;

use crate::snapshot::SnapshotEntry;
use crate::Result;
use async_trait::async_trait;

/// Byte-level storage for snapshot files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackupStorage: Send + Sync {
    /// Make sure the storage location exists
    ///
    /// Idempotent: succeeds when the location is already there.
    async fn ensure_ready(&self) -> Result<()>;

    /// Write a snapshot file, replacing any file with the same name
    ///
    /// # Returns
    /// A human-readable location of the written file
    async fn write(&self, name: &str, data: &[u8]) -> Result<String>;

    /// Read a snapshot file
    ///
    /// # Returns
    /// `None` when no file with that name exists
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// List stored snapshot files, in no particular order
    ///
    /// A missing location yields an empty list.
    async fn list(&self) -> Result<Vec<SnapshotEntry>>;

    /// Delete a snapshot file
    async fn delete(&self, name: &str) -> Result<()>;
}

pub use local::LocalBackupStorage;

/// Reject anything that is not a plain file name
pub(crate) fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_names() {
        assert!(is_safe_file_name("backup_2024-05-01T14-03-07-123-03-00.json"));
        assert!(!is_safe_file_name(""));
        assert!(!is_safe_file_name(".."));
        assert!(!is_safe_file_name("../secrets.json"));
        assert!(!is_safe_file_name("nested/backup.json"));
        assert!(!is_safe_file_name("..\\backup.json"));
    }
}
