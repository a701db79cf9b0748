/*!
Backup document schema and naming.

A snapshot is written once and never modified. Records are kept as raw JSON
values so that a single malformed entry cannot make the whole document
unreadable; typed decoding happens per record during restore.
*/

use crate::config::BACKUP_FORMAT_VERSION;
use crate::model::{ClubSanction, PersonalSanction, User};
use crate::Result;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder written in place of every user password
pub const REDACTED_PASSWORD: &str = "[REDACTED]";

/// Filename prefix of every snapshot
pub const BACKUP_FILE_PREFIX: &str = "backup_";

/// Filename extension of every snapshot
pub const BACKUP_FILE_EXTENSION: &str = ".json";

/// Aggregate counts computed when the snapshot is taken
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStatistics {
    pub total_club_sanctions: usize,
    pub total_personal_sanctions: usize,
    pub total_users: usize,
    pub backup_date: String,
}

/// A complete backup document
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Creation time in the configured offset, millisecond precision
    pub timestamp: String,
    pub version: String,
    #[serde(default)]
    pub club_sanctions: Vec<Value>,
    #[serde(default)]
    pub personal_sanctions: Vec<Value>,
    #[serde(default)]
    pub users: Vec<Value>,
    pub statistics: SnapshotStatistics,
}

impl Snapshot {
    /// Assemble a snapshot from the live collections
    ///
    /// User passwords are replaced by [`REDACTED_PASSWORD`].
    pub fn capture(
        timestamp: String,
        club_sanctions: &[ClubSanction],
        personal_sanctions: &[PersonalSanction],
        users: &[User],
    ) -> Result<Self> {
        let club_sanctions = club_sanctions
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let personal_sanctions = personal_sanctions
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let users = users
            .iter()
            .map(|user| {
                let mut redacted = user.clone();
                redacted.password = REDACTED_PASSWORD.to_string();
                serde_json::to_value(redacted)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let statistics = SnapshotStatistics {
            total_club_sanctions: club_sanctions.len(),
            total_personal_sanctions: personal_sanctions.len(),
            total_users: users.len(),
            backup_date: timestamp.clone(),
        };

        Ok(Self {
            timestamp,
            version: BACKUP_FORMAT_VERSION.to_string(),
            club_sanctions,
            personal_sanctions,
            users,
            statistics,
        })
    }

    /// Filename this snapshot is stored under
    pub fn file_name(&self) -> String {
        file_name_for_timestamp(&self.timestamp)
    }

    /// Pretty-printed JSON, two-space indented
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Listing entry for a stored snapshot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub file_name: String,
    /// Last modification time
    pub date: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// Format an instant as the snapshot timestamp, e.g. `2024-05-01T14:03:07.123-03:00`
pub fn format_timestamp(now: DateTime<Utc>, offset: &FixedOffset) -> String {
    now.with_timezone(offset)
        .to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// `backup_<timestamp with ':' and '.' replaced by '-'>.json`
pub fn file_name_for_timestamp(timestamp: &str) -> String {
    let sanitized: String = timestamp
        .chars()
        .map(|c| if c == ':' || c == '.' { '-' } else { c })
        .collect();
    format!("{BACKUP_FILE_PREFIX}{sanitized}{BACKUP_FILE_EXTENSION}")
}

/// True for names that look like snapshot files
pub fn is_backup_file_name(name: &str) -> bool {
    name.starts_with(BACKUP_FILE_PREFIX) && name.ends_with(BACKUP_FILE_EXTENSION)
}
