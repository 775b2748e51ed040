//! Institutional clock — the single trusted time source for scheduling rules.
//!
//! Every bookability decision (weekend, past, cutoff, horizon) evaluates
//! against institutional time, never a caller's device clock, so two clients
//! in different locales always agree on what is bookable.

use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::config;

/// Source of the institutional "now" for every scheduling decision.
pub trait Clock: Send + Sync {
    /// Current date and time in the institutional timezone.
    fn now(&self) -> NaiveDateTime;

    /// Current calendar date in the institutional timezone.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Production clock: UTC read once, shifted through the fixed institutional offset.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now()
            .with_timezone(&config::institutional_offset())
            .naive_local()
    }
}

/// Clock pinned to a known instant. Used by tests and deterministic replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Pin the clock to the given institutional date and time.
    ///
    /// Panics on out-of-range components; intended for literals.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let date = NaiveDate::from_ymd_opt(year, month, day).expect("valid date");
        let time = date.and_hms_opt(hour, minute, 0).expect("valid time");
        FixedClock(time)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_pinned() {
        let clock = FixedClock::at(2024, 1, 15, 9, 30);
        assert_eq!(clock.now().to_string(), "2024-01-15 09:30:00");
        assert_eq!(clock.today().to_string(), "2024-01-15");
    }

    #[test]
    fn system_clock_applies_institutional_offset() {
        let utc = Utc::now().naive_utc();
        let institutional = SystemClock.now();
        let drift = (utc - institutional).num_minutes();
        // UTC-5: institutional time trails UTC by 300 minutes
        assert!((drift - 300).abs() <= 1, "unexpected drift: {drift} minutes");
    }

    #[test]
    fn today_is_the_date_of_now() {
        let clock = FixedClock::at(2024, 3, 1, 23, 59);
        assert_eq!(clock.today(), clock.now().date());
    }
}
