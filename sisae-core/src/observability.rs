/*!
Logging setup and optional Prometheus instrumentation.

Backup and restore activity is reported through `tracing` events. With the
`metrics` feature enabled, a process-wide [`SisaeMetrics`] registry also
counts backups, failures and restored records.
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{Result, SisaeError};

/// Default filter directive when `RUST_LOG` is not set
pub const DEFAULT_LOG_DIRECTIVE: &str = "sisae_core=info";

#[cfg(feature = "metrics")]
static METRICS: OnceLock<SisaeMetrics> = OnceLock::new();

/// Counters for backup and restore activity
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct SisaeMetrics {
    pub backups_created_total: Counter,
    pub backup_failures_total: Counter,
    pub records_restored_total: Counter,
    pub records_skipped_total: Counter,
    pub backup_size_bytes: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter> {
    let counter = Counter::new(name, help)
        .map_err(|e| SisaeError::config(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| SisaeError::config(format!("Failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
impl SisaeMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let backups_created_total = counter(
            &registry,
            "sisae_backups_created_total",
            "Total backup snapshots written",
        )?;
        let backup_failures_total = counter(
            &registry,
            "sisae_backup_failures_total",
            "Total backup snapshots that could not be written",
        )?;
        let records_restored_total = counter(
            &registry,
            "sisae_records_restored_total",
            "Total sanction records reinserted by restores",
        )?;
        let records_skipped_total = counter(
            &registry,
            "sisae_records_skipped_total",
            "Total sanction records skipped during restores",
        )?;

        let backup_size_bytes = Histogram::with_opts(
            HistogramOpts::new("sisae_backup_size_bytes", "Size of backup snapshots in bytes")
                .buckets(prometheus::exponential_buckets(1024.0, 4.0, 8).map_err(|e| {
                    SisaeError::config(format!("Invalid backup size buckets: {e}"))
                })?),
        )
        .map_err(|e| {
            SisaeError::config(format!("Failed to create backup_size_bytes metric: {e}"))
        })?;
        registry
            .register(Box::new(backup_size_bytes.clone()))
            .map_err(|e| SisaeError::config(format!("Failed to register backup_size_bytes: {e}")))?;

        Ok(Self {
            backups_created_total,
            backup_failures_total,
            records_restored_total,
            records_skipped_total,
            backup_size_bytes,
            registry,
        })
    }

    /// Get or initialize the process-wide instance
    pub fn global() -> &'static SisaeMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize SISAE metrics"))
    }

    pub fn record_backup_created(&self, size_bytes: usize) {
        self.backups_created_total.inc();
        self.backup_size_bytes.observe(size_bytes as f64);
    }

    pub fn record_backup_failure(&self) {
        self.backup_failures_total.inc();
    }

    pub fn record_records_restored(&self, count: usize) {
        self.records_restored_total.inc_by(count as f64);
    }

    pub fn record_records_skipped(&self, count: usize) {
        self.records_skipped_total.inc_by(count as f64);
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();

        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| SisaeError::config(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| SisaeError::config(format!("Metrics output is not UTF-8: {e}")))
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_DIRECTIVE`]. With `json` set, events
/// are written as one JSON object per line.
///
/// # Errors
/// Fails when a global subscriber is already installed.
pub fn init_observability(json: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    SisaeMetrics::global();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    };

    result.map_err(|e| {
        SisaeError::config(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::info!("SISAE logging initialized");
    Ok(())
}

/// JSON logging with the default filter
pub fn init_default_observability() -> Result<()> {
    init_observability(true)
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;

    #[test]
    fn test_recording_metrics() {
        let metrics = SisaeMetrics::global();
        let before = metrics.records_restored_total.get();

        metrics.record_backup_created(4096);
        metrics.record_backup_failure();
        metrics.record_records_restored(5);
        metrics.record_records_skipped(1);

        assert!(metrics.records_restored_total.get() >= before + 5.0);
    }

    #[test]
    fn test_gather_metrics() {
        let metrics = SisaeMetrics::global();
        metrics.record_backup_created(2048);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("sisae_backups_created_total"));
        assert!(text.contains("sisae_backup_size_bytes"));
    }
}
