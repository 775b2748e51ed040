//! Repository layer — entity-scoped database operations.
//!
//! Dates are stored as `YYYY-MM-DD`, slot times as `HH:MM`, timestamps as
//! `YYYY-MM-DD HH:MM:SS`. All conversions happen here so the feature modules
//! only ever see chrono types.

mod appointment;
mod psychologist;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use super::DatabaseError;

// Re-export all public items from sub-modules
pub use appointment::*;
pub use psychologist::*;

pub(crate) fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn parse_timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .unwrap_or_default()
}

pub(crate) fn format_time(t: &NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

// Scheduling math depends on these fields, so unlike timestamps they do not
// degrade to a default on corruption.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad date {s}: {e}")))
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime, DatabaseError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad time {s}: {e}")))
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn timestamp_round_trip_drops_subseconds() {
        let t = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_nano_opt(10, 30, 0, 123_456_789)
            .unwrap();
        let parsed = parse_timestamp(&format_timestamp(&t));
        assert_eq!(parsed, t.with_nanosecond(0).unwrap());
    }

    #[test]
    fn timestamp_accepts_t_separator() {
        let parsed = parse_timestamp("2024-01-15T10:30:00");
        assert_eq!(parsed.to_string(), "2024-01-15 10:30:00");
    }

    #[test]
    fn slot_time_round_trip() {
        let t = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(format_time(&t), "09:30");
        assert_eq!(parse_time("09:30").unwrap(), t);
    }

    #[test]
    fn corrupt_date_and_time_are_rejected() {
        assert!(parse_date("15/01/2024").is_err());
        assert!(parse_time("9am").is_err());
        assert!(parse_uuid("not-a-uuid").is_err());
    }
}
