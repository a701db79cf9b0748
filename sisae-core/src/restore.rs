/*!
Restore orchestration.

Replaces the live sanction collections with the contents of a snapshot while
keeping every record's original `numeroCarga`. The steps are:

1. Load the requested snapshot; stop here if it cannot be loaded.
2. Take a safety snapshot of the current state.
3. Clear both sanction collections (users are kept).
4. Re-insert club and personal records in ascending record-number order.
5. Re-apply the reported flag on personal records that had it.

A record that fails to decode or insert is logged, reported in the outcome
and skipped. A personal record whose reported flag cannot be re-applied is
reported too, marked as inserted. Nothing is rolled back once clearing has started; the safety
snapshot from step 1 is the way back.
*/

use crate::model::{
    ClubSanction, Collection, NewClubSanction, NewPersonalSanction, PersonalSanction,
};
use crate::repository::SanctionRepository;
use crate::sequence::SequenceAllocator;
use crate::storage::BackupStorage;
use crate::store::SnapshotStore;
use crate::{Result, SisaeError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

/// A snapshot record that could not be restored
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub collection: Collection,
    pub numero_carga: Option<u32>,
    pub reason: String,
    /// The record is live but incomplete (it lost its reported flag)
    #[serde(default)]
    pub inserted: bool,
}

impl SkippedRecord {
    /// The skip as a [`SisaeError::RecordRestore`]
    pub fn as_error(&self) -> SisaeError {
        SisaeError::RecordRestore {
            collection: self.collection,
            numero: self.numero_carga,
            reason: self.reason.clone(),
        }
    }
}

/// Counts of what a successful restore put back
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoredData {
    pub club_sanctions: usize,
    pub personal_sanctions: usize,
    /// Timestamp of the snapshot restored from
    pub timestamp: String,
    /// Location of the snapshot taken just before clearing
    pub safety_backup: String,
    pub skipped: Vec<SkippedRecord>,
}

/// Structured result handed back to the caller
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_data: Option<RestoredData>,
}

impl RestoreOutcome {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            restored_data: None,
        }
    }
}

/// Drives a restore against a snapshot store and its repository
pub struct RestoreOrchestrator<'a, S, R: ?Sized> {
    store: &'a SnapshotStore<S, R>,
}

impl<'a, S, R> RestoreOrchestrator<'a, S, R>
where
    S: BackupStorage,
    R: SanctionRepository + ?Sized,
{
    pub fn new(store: &'a SnapshotStore<S, R>) -> Self {
        Self { store }
    }

    /// Restore the live sanction data from `file_name`
    ///
    /// Never returns an error: failures come back as
    /// `RestoreOutcome { success: false, .. }`.
    pub async fn restore(&self, file_name: &str) -> RestoreOutcome {
        match self.run(file_name).await {
            Ok(data) => {
                let message = if data.skipped.is_empty() {
                    format!("Restore completed from {file_name}")
                } else {
                    format!(
                        "Restore completed from {file_name} ({} records skipped)",
                        data.skipped.len()
                    )
                };
                RestoreOutcome {
                    success: true,
                    message,
                    restored_data: Some(data),
                }
            }
            Err(e) => {
                error!("Error during restoration from {}: {}", file_name, e);
                RestoreOutcome::failed(match e {
                    SisaeError::NotFound(_) | SisaeError::InvalidFormat(_) => {
                        format!("Could not load backup file {file_name}")
                    }
                    other => format!("Error while restoring {file_name}: {other}"),
                })
            }
        }
    }

    async fn run(&self, file_name: &str) -> Result<RestoredData> {
        // Loaded first: the safety backup may evict the file being restored
        let snapshot = self.store.load(file_name).await?;

        let safety_backup = self.store.create().await?;
        info!(safety_backup = %safety_backup, "Safety backup taken before restore");

        let repository = self.store.repository();
        repository
            .clear_sanctions()
            .await
            .map_err(|e| SisaeError::fatal_restore(format!("clearing sanctions failed: {e}")))?;

        let allocator = SequenceAllocator::new(&**repository);
        let mut skipped = Vec::new();

        info!(count = snapshot.club_sanctions.len(), "Restoring club sanctions");
        let mut club_restored = 0;
        for value in sorted_by_number(&snapshot.club_sanctions) {
            let result: Result<ClubSanction> = async {
                let (numero, entry) = decode::<NewClubSanction>(value)?;
                allocator.insert_club_with_number(entry, numero).await
            }
            .await;

            match result {
                Ok(restored) => {
                    info!(numero = restored.numero_carga, id = %restored.id, "Club sanction restored");
                    club_restored += 1;
                }
                Err(e) => skipped.push(skip(Collection::Club, value, e, false)),
            }
        }

        info!(count = snapshot.personal_sanctions.len(), "Restoring personal sanctions");
        let mut personal_restored = 0;
        for value in sorted_by_number(&snapshot.personal_sanctions) {
            let result: Result<PersonalSanction> = async {
                let (numero, entry) = decode::<NewPersonalSanction>(value)?;
                allocator.insert_personal_with_number(entry, numero).await
            }
            .await;

            let restored = match result {
                Ok(restored) => restored,
                Err(e) => {
                    skipped.push(skip(Collection::Personal, value, e, false));
                    continue;
                }
            };

            if was_reported(value) {
                if let Err(e) = repository
                    .mark_personal_sanctions_reported(vec![restored.id.clone()])
                    .await
                {
                    let cause = SisaeError::repository(format!("reported flag not restored: {e}"));
                    skipped.push(skip(Collection::Personal, value, cause, true));
                    continue;
                }
            }

            info!(numero = restored.numero_carga, id = %restored.id, "Personal sanction restored");
            personal_restored += 1;
        }

        #[cfg(feature = "metrics")]
        {
            let metrics = crate::observability::SisaeMetrics::global();
            metrics.record_records_restored(club_restored + personal_restored);
            metrics.record_records_skipped(skipped.len());
        }

        Ok(RestoredData {
            club_sanctions: club_restored,
            personal_sanctions: personal_restored,
            timestamp: snapshot.timestamp,
            safety_backup,
            skipped,
        })
    }
}

fn record_number(value: &Value) -> Option<u32> {
    value
        .get("numeroCarga")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn was_reported(value: &Value) -> bool {
    value
        .get("reportadaEnPdf")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Records in ascending record-number order; records without a usable
/// number sort first and fail on decode
fn sorted_by_number(values: &[Value]) -> Vec<&Value> {
    let mut sorted: Vec<&Value> = values.iter().collect();
    sorted.sort_by_key(|v| record_number(v));
    sorted
}

/// Extract the record number and the writable fields of a snapshot record
fn decode<T: DeserializeOwned>(value: &Value) -> Result<(u32, T)> {
    let numero = record_number(value)
        .ok_or_else(|| SisaeError::validation("missing or invalid numeroCarga"))?;
    let entry = T::deserialize(value)?;
    Ok((numero, entry))
}

fn skip(
    collection: Collection,
    value: &Value,
    cause: SisaeError,
    inserted: bool,
) -> SkippedRecord {
    let skipped = SkippedRecord {
        collection,
        numero_carga: record_number(value),
        reason: cause.to_string(),
        inserted,
    };
    warn!(
        collection = %skipped.collection,
        numero = ?skipped.numero_carga,
        inserted,
        reason = %skipped.reason,
        "Record not restored"
    );
    skipped
}
