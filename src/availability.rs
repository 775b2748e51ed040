//! Bookable-day rules — one pure precedence chain over the institutional clock.
//!
//! Weekend, past, same-day cutoff, booking horizon. Every entry point
//! (booking, direct scheduling, rescheduling, calendar queries) classifies
//! dates here, so the rules cannot drift apart between screens. "Now" always
//! comes from the trusted institutional clock, never from a caller.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;

use crate::clock::Clock;
use crate::config;
use crate::models::DayStatus;
use crate::scheduling::SchedulingError;

/// Classify one candidate date against institutional "now".
///
/// The first matching rule wins: weekend days are blocked outright, then
/// past dates, then today once the clock passes the cutoff, then anything
/// past the booking horizon.
pub fn day_status(now: NaiveDateTime, date: NaiveDate) -> DayStatus {
    let today = now.date();

    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return DayStatus::BlockedWeekend;
    }
    if date < today {
        return DayStatus::BlockedPast;
    }
    if date == today && now.time() > config::same_day_cutoff() {
        return DayStatus::BlockedPastCutoffToday;
    }
    if date > today + Duration::days(config::BOOKING_HORIZON_DAYS) {
        return DayStatus::BlockedBeyondHorizon;
    }
    DayStatus::Available
}

/// One calendar day with its bookability.
#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
}

/// Day status for a single date, read from the trusted clock.
pub fn day_availability(clock: &impl Clock, date: NaiveDate) -> DayStatus {
    day_status(clock.now(), date)
}

/// Per-day statuses for a whole calendar month, first day first.
pub fn month_availability(
    clock: &impl Clock,
    year: i32,
    month: u32,
) -> Result<Vec<DayAvailability>, SchedulingError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(SchedulingError::InvalidMonth { year, month })?;
    let now = clock.now();

    let mut days = Vec::with_capacity(31);
    let mut cursor = first;
    loop {
        days.push(DayAvailability {
            date: cursor,
            status: day_status(now, cursor),
        });
        match cursor.succ_opt() {
            Some(next) if next.month() == month => cursor = next,
            _ => break,
        }
    }
    Ok(days)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
