use std::path::PathBuf;

use chrono::{FixedOffset, NaiveTime};

/// Application-level constants
pub const APP_NAME: &str = "Ataraxia";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Slot grid granularity in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// Standard appointment duration in minutes. Longer than the grid step, so an
/// appointment occupies every grid cell its interval overlaps.
pub const APPOINTMENT_MINUTES: i64 = 45;

/// Furthest bookable day, counted in days after today.
pub const BOOKING_HORIZON_DAYS: i64 = 14;

/// Minimum notice before a confirmed appointment may be rescheduled, in hours.
pub const RESCHEDULE_NOTICE_HOURS: i64 = 24;

/// Institutional timezone offset from UTC, in hours. Fixed, no DST.
pub const INSTITUTIONAL_UTC_OFFSET_HOURS: i32 = -5;

/// First bookable slot start of the day (08:00).
pub fn day_opening() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).expect("valid opening time")
}

/// Last bookable slot start of the day (19:30).
pub fn day_closing() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 30, 0).expect("valid closing time")
}

/// Same-day booking closes once the institutional clock passes this (13:10).
pub fn same_day_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(13, 10, 0).expect("valid cutoff time")
}

/// The institutional timezone as a chrono offset.
pub fn institutional_offset() -> FixedOffset {
    FixedOffset::east_opt(INSTITUTIONAL_UTC_OFFSET_HOURS * 3600)
        .expect("offset within range")
}

/// Get the application data directory
/// ~/Ataraxia/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Ataraxia")
}

/// Get the on-disk database path
pub fn database_path() -> PathBuf {
    app_data_dir().join("ataraxia.db")
}

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> &'static str {
    "info"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Ataraxia"));
    }

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("ataraxia.db"));
    }

    #[test]
    fn operating_window_spans_the_day() {
        assert!(day_opening() < day_closing());
        assert!(same_day_cutoff() > day_opening());
        assert!(same_day_cutoff() < day_closing());
    }

    #[test]
    fn institutional_offset_is_west_of_utc() {
        assert_eq!(institutional_offset().local_minus_utc(), -5 * 3600);
    }
}
