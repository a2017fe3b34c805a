//! Wall-clock abstraction shared by the cache and date-bucketed cache keys.

use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use time::{Date, OffsetDateTime};

/// Source of the current UTC time.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Starts at 2024-06-01T00:00:00Z.
    pub fn fixed() -> Self {
        Self::new(OffsetDateTime::from_unix_timestamp(1_717_200_000).unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, at: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Formats a date as `YYYY-MM-DD`.
pub fn iso_date(date: Date) -> String {
    date.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_by_requested_duration() {
        let clock = ManualClock::fixed();
        let start = clock.now();

        clock.advance(Duration::from_secs(90));

        assert_eq!(clock.now() - start, time::Duration::seconds(90));
    }

    #[test]
    fn fixed_clock_reports_expected_day() {
        let clock = ManualClock::fixed();
        assert_eq!(iso_date(clock.today()), "2024-06-01");
    }

    #[test]
    fn iso_date_pads_month_and_day() {
        let date = Date::from_calendar_date(2025, time::Month::March, 7).expect("valid date");
        assert_eq!(iso_date(date), "2025-03-07");
    }
}
