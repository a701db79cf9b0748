/*!
# SISAE Core

Backup and restore engine for the sanctions registry.

The crate snapshots the live sanction and user collections into
self-describing JSON documents, keeps the newest ten of them on disk, and can
rebuild the sanction collections from any stored snapshot while preserving
each record's original number.

## Architecture

- [`SanctionRepository`] is the port to the live data store. It is implemented
  by [`MemoryRepository`] and the file-backed [`JsonFileRepository`].
- [`BackupStorage`] is the port to snapshot storage. It is implemented by
  [`LocalBackupStorage`].
- [`SnapshotStore`] creates, lists, loads and evicts snapshots.
- [`RestoreOrchestrator`] takes a safety backup, clears the live sanctions and
  reinserts every record from the snapshot, isolating per-record failures.
- [`BackupScheduler`] runs one backup at start-up and then one per day.
- [`BackupService`] ties everything together behind a single lock.

## Usage

```rust,no_run
use sisae_core::{BackupConfig, BackupService, JsonFileRepository};
use std::sync::Arc;

# async fn run() -> sisae_core::Result<()> {
let repository = Arc::new(JsonFileRepository::open("data.json").await?);
let service = Arc::new(BackupService::from_config(BackupConfig::from_env()?, repository)?);

let location = service.create_backup().await?;
let outcome = service.restore_from_backup("backup_2024-05-01T02-00-00-000-03-00.json").await;
println!("{location}: {}", outcome.message);

let scheduler = service.start_scheduler()?;
scheduler.shutdown().await;
# Ok(())
# }
```
*/

pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod repository;
pub mod restore;
pub mod scheduler;
pub mod sequence;
pub mod service;
pub mod snapshot;
pub mod storage;
pub mod store;


pub use clock::{Clock, SystemClock};
pub use config::{BackupConfig, DailySchedule, RETENTION_LIMIT};
pub use error::{Result, SisaeError};
pub use model::{
    ClubSanction, Collection, NewClubSanction, NewPersonalSanction, PersonalSanction, User,
};
pub use observability::{init_default_observability, init_observability};
pub use repository::{DataSet, JsonFileRepository, MemoryRepository, SanctionRepository};
pub use restore::{RestoreOrchestrator, RestoreOutcome, RestoredData, SkippedRecord};
pub use scheduler::{BackupScheduler, SchedulerHandle};
pub use sequence::SequenceAllocator;
pub use service::{BackupListing, BackupService};
pub use snapshot::{Snapshot, SnapshotEntry, SnapshotStatistics};
pub use storage::{BackupStorage, LocalBackupStorage};
pub use store::SnapshotStore;

#[cfg(feature = "metrics")]
pub use observability::SisaeMetrics;
