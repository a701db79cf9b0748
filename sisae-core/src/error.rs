/*!
Error types for the SISAE backup engine.
*/

use crate::model::Collection;
use thiserror::Error;

/// Result type used throughout the SISAE core.
pub type Result<T> = std::result::Result<T, SisaeError>;

/// Errors that can occur during backup, restore and data-access operations.
#[derive(Error, Debug)]
pub enum SisaeError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested snapshot does not exist
    #[error("Backup not found: {0}")]
    NotFound(String),

    /// Snapshot exists but cannot be parsed
    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    /// Storage errors (directory creation, writes, deletions)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Errors raised by the data-access layer
    #[error("Repository error: {0}")]
    Repository(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single record could not be restored
    #[error("Failed to restore {collection} sanction #{}: {reason}", numero.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()))]
    RecordRestore {
        collection: Collection,
        numero: Option<u32>,
        reason: String,
    },

    /// The restore as a whole could not proceed
    #[error("Restore failed: {0}")]
    FatalRestore(String),
}

impl SisaeError {
    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new repository error
    pub fn repository<S: Into<String>>(msg: S) -> Self {
        Self::Repository(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new fatal restore error
    pub fn fatal_restore<S: Into<String>>(msg: S) -> Self {
        Self::FatalRestore(msg.into())
    }

    /// True when the error means "no such backup" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
