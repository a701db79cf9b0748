//! Configuration for the backup engine
//!
//! Holds where snapshots are written, when the daily automatic backup runs
//! and which fixed UTC offset is used for human-readable timestamps.

use crate::{Result, SisaeError};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of snapshots kept on disk; older ones are evicted after each backup
pub const RETENTION_LIMIT: usize = 10;

/// Snapshot document format version
pub const BACKUP_FORMAT_VERSION: &str = "1.0";

/// America/Argentina/Cordoba, which observes no daylight saving time
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -180;

/// Wall-clock time of day for the automatic backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub hour: u32,
    pub minute: u32,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self { hour: 2, minute: 0 }
    }
}

/// Configuration structure for the backup service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory holding `backup_*.json` files
    pub backup_dir: PathBuf,
    /// Daily automatic backup time, in the configured offset
    pub schedule: DailySchedule,
    /// Offset from UTC used for timestamps and the schedule
    pub utc_offset_minutes: i32,
}

impl BackupConfig {
    /// Default configuration rooted at the given directory
    pub fn with_backup_dir<P: Into<PathBuf>>(backup_dir: P) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from `SISAE_*` environment variables
    ///
    /// Recognised variables:
    /// - `SISAE_BACKUP_DIR`
    /// - `SISAE_BACKUP_HOUR` / `SISAE_BACKUP_MINUTE`
    /// - `SISAE_UTC_OFFSET_MINUTES`
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("SISAE_BACKUP_DIR") {
            config.backup_dir = PathBuf::from(dir);
        }
        if let Some(hour) = lookup("SISAE_BACKUP_HOUR") {
            config.schedule.hour = parse_var("SISAE_BACKUP_HOUR", &hour)?;
        }
        if let Some(minute) = lookup("SISAE_BACKUP_MINUTE") {
            config.schedule.minute = parse_var("SISAE_BACKUP_MINUTE", &minute)?;
        }
        if let Some(offset) = lookup("SISAE_UTC_OFFSET_MINUTES") {
            config.utc_offset_minutes = parse_var("SISAE_UTC_OFFSET_MINUTES", &offset)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// The configured offset as a chrono time zone
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            SisaeError::config(format!(
                "UTC offset out of range: {} minutes",
                self.utc_offset_minutes
            ))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.backup_dir.as_os_str().is_empty() {
            return Err(SisaeError::config("backup directory cannot be empty"));
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(SisaeError::config(format!(
                "daily backup time must be in 24h range, got {:02}:{:02}",
                self.schedule.hour, self.schedule.minute
            )));
        }
        self.offset()?;
        Ok(())
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from("./backups"),
            schedule: DailySchedule::default(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SisaeError::config(format!("invalid value for {name}: '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = BackupConfig::default();
        assert_eq!(config.backup_dir, PathBuf::from("./backups"));
        assert_eq!(config.schedule, DailySchedule { hour: 2, minute: 0 });
        assert_eq!(config.utc_offset_minutes, -180);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_offset_is_minus_three_hours() {
        let offset = BackupConfig::default().offset().unwrap();
        assert_eq!(offset.local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = BackupConfig::from_lookup(lookup_from(&[
            ("SISAE_BACKUP_DIR", "/var/lib/sisae/backups"),
            ("SISAE_BACKUP_HOUR", "4"),
            ("SISAE_BACKUP_MINUTE", "30"),
            ("SISAE_UTC_OFFSET_MINUTES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.backup_dir, PathBuf::from("/var/lib/sisae/backups"));
        assert_eq!(config.schedule, DailySchedule { hour: 4, minute: 30 });
        assert_eq!(config.utc_offset_minutes, 0);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = BackupConfig::from_lookup(lookup_from(&[("SISAE_BACKUP_HOUR", "two")]));
        assert!(matches!(result, Err(SisaeError::Config(_))));
    }

    #[test]
    fn test_validate_schedule_range() {
        let mut config = BackupConfig::default();
        config.schedule.hour = 24;
        assert!(config.validate().is_err());

        config.schedule.hour = 23;
        config.schedule.minute = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_offset_range() {
        let mut config = BackupConfig::default();
        config.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
    }
}
