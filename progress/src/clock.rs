use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

/// Source of "now" and of the calendar day streaks and daily challenges
/// are keyed on.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day an instant falls on.
    fn day_of(&self, at: DateTime<Utc>) -> NaiveDate;

    fn today(&self) -> NaiveDate {
        self.day_of(self.now())
    }
}

/// Wall clock; the calendar day is the server's local day.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&Local).date_naive()
    }
}

/// Manually advanced clock whose calendar day is the UTC date of `now`.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon UTC on the given day.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(
            date.and_hms_opt(12, 0, 0)
                .expect("noon is a valid time of day")
                .and_utc(),
        )
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.date_naive()
    }
}
