//! Clock sources
//!
//! Refill gating works on calendar days and object keys carry the UTC date,
//! so both read time through this trait instead of the system clock directly.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant in UTC (used for object key dates)
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current calendar date used for the daily refill marker
    fn today(&self) -> NaiveDate;
}

/// Wall clock; the refill date follows the process's local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock frozen at one instant
///
/// `today()` is the UTC date of that instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Noon UTC on the given date
    pub fn on_date(date: NaiveDate) -> Self {
        let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::default()));
        Self {
            now: midnight + chrono::Duration::hours(12),
        }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}
