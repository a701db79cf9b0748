//! Wall-clock source for snapshot timestamps and the daily schedule.

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that returns a fixed instant and moves only when told to.
///
/// Each call to `now` advances by `step`, so consecutive snapshots created
/// within a test get distinct timestamps.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    millis: std::sync::atomic::AtomicI64,
    step_millis: i64,
}

#[cfg(test)]
impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>, step: chrono::Duration) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(start.timestamp_millis()),
            step_millis: step.num_milliseconds(),
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        use std::sync::atomic::Ordering;
        let millis = self.millis.fetch_add(self.step_millis, Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}
