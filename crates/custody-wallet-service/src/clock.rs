//! Wall-clock source

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;

/// Wall-clock date and time source
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64 {
        u64::try_from(self.now().timestamp_millis()).unwrap_or(0)
    }

    /// Current UTC date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// System clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulators
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move forward by `ms` milliseconds
    pub fn advance_ms(&self, ms: i64) {
        *self.now.lock() += chrono::Duration::milliseconds(ms);
    }

    /// Move forward by whole days
    pub fn advance_days(&self, days: i64) {
        *self.now.lock() += chrono::Duration::days(days);
    }

    /// Jump to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
