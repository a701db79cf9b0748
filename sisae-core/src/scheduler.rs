/*!
Daily automatic backups.

On start the scheduler runs the job once, then sleeps until the configured
wall-clock time on the following calendar day, runs the job again, and
repeats. The next fire time is recomputed from the clock every cycle so the
schedule stays pinned to the wall clock. Job failures are logged and never
stop the loop.
*/

use crate::clock::Clock;
use crate::config::DailySchedule;
use crate::{Result, SisaeError};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Instant of `schedule` on the calendar day after `now`, in `offset`
pub fn next_run_after(
    now: DateTime<Utc>,
    offset: &FixedOffset,
    schedule: DailySchedule,
) -> Result<DateTime<Utc>> {
    let tomorrow = now
        .with_timezone(offset)
        .date_naive()
        .succ_opt()
        .ok_or_else(|| SisaeError::config("no calendar day after the current one"))?;

    let local = tomorrow
        .and_hms_opt(schedule.hour, schedule.minute, 0)
        .ok_or_else(|| {
            SisaeError::config(format!(
                "invalid daily backup time {:02}:{:02}",
                schedule.hour, schedule.minute
            ))
        })?;

    offset
        .from_local_datetime(&local)
        .single()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| SisaeError::config("daily backup time is not representable"))
}

/// Runs a backup job at start-up and then once a day
pub struct BackupScheduler {
    schedule: DailySchedule,
    offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl BackupScheduler {
    pub fn new(schedule: DailySchedule, offset: FixedOffset, clock: Arc<dyn Clock>) -> Self {
        Self {
            schedule,
            offset,
            clock,
        }
    }

    /// Start the scheduling loop on a tokio task
    ///
    /// The loop runs until [`SchedulerHandle::shutdown`] is called or the
    /// handle is dropped.
    pub fn spawn<F>(self, job: F) -> SchedulerHandle
    where
        F: Fn() -> BoxFuture<'static, Result<String>> + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(job, shutdown_rx));
        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run<F>(self, job: F, mut shutdown: watch::Receiver<bool>)
    where
        F: Fn() -> BoxFuture<'static, Result<String>> + Send + Sync + 'static,
    {
        run_job(&job, "initial").await;

        loop {
            let now = self.clock.now();
            let next = match next_run_after(now, &self.offset, self.schedule) {
                Ok(next) => next,
                Err(e) => {
                    error!("Cannot schedule automatic backup: {}", e);
                    return;
                }
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(
                next_run = %next.with_timezone(&self.offset),
                wait_secs = wait.as_secs(),
                "Next automatic backup scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => {
                    info!("Backup scheduler stopped");
                    return;
                }
            }

            run_job(&job, "daily").await;
        }
    }
}

async fn run_job<F>(job: &F, kind: &str)
where
    F: Fn() -> BoxFuture<'static, Result<String>>,
{
    match job().await {
        Ok(location) => info!(kind, location = %location, "Automatic backup created"),
        Err(e) => error!(kind, "Automatic backup failed: {}", e),
    }
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for the task to finish
    ///
    /// A job that is already running is allowed to complete.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Backup scheduler task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
