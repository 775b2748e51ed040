//! Slot allocator — the fixed 30-minute booking grid for one psychologist-day.
//!
//! Every day carries the same 24 slot starts, 08:00 through 19:30. Occupancy
//! is derived, never stored: a grid cell is taken when any non-cancelled
//! appointment overlaps it, and a 45-minute session therefore claims the
//! neighbouring cell as well as its own.

use chrono::{Duration, NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::availability::day_status;
use crate::clock::Clock;
use crate::config;
use crate::db::{repository, DatabaseError};
use crate::models::Appointment;
use crate::scheduling::SchedulingError;

// ─── Types ────────────────────────────────────────────────────────────────────

/// One grid cell with its derived occupancy.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub time: NaiveTime,
    pub available: bool,
}

// ─── Grid geometry ────────────────────────────────────────────────────────────

/// Every slot start in the operating window, in order.
pub fn slot_grid() -> Vec<NaiveTime> {
    let step = Duration::minutes(config::SLOT_MINUTES);
    let closing = config::day_closing();

    let mut times = Vec::new();
    let mut cursor = config::day_opening();
    while cursor <= closing {
        times.push(cursor);
        cursor += step;
    }
    times
}

/// Whether `time` is a slot start inside the operating window.
pub fn is_grid_time(time: NaiveTime) -> bool {
    let opening = config::day_opening();
    if time < opening || time > config::day_closing() {
        return false;
    }
    (time - opening).num_seconds() % (config::SLOT_MINUTES * 60) == 0
}

// Half-open interval overlap on one day's timeline.
fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

/// Mark the full grid against one day's appointments.
///
/// Cancelled rows never occupy; everything else blocks each cell its
/// `[time, time + duration)` interval touches.
pub fn mark_grid(appointments: &[Appointment]) -> Vec<SlotView> {
    let step = Duration::minutes(config::SLOT_MINUTES);
    slot_grid()
        .into_iter()
        .map(|cell| {
            let cell_end = cell + step;
            let occupied = appointments
                .iter()
                .filter(|a| a.status.occupies_slot())
                .any(|a| {
                    let end = a.time + Duration::minutes(a.duration_minutes);
                    overlaps(a.time, end, cell, cell_end)
                });
            SlotView {
                time: cell,
                available: !occupied,
            }
        })
        .collect()
}

/// Whether the whole `[time, time + duration)` interval is free for this
/// psychologist-day. `exclude` removes one appointment from the occupancy
/// set, so a reschedule never collides with the booking it is moving.
pub fn interval_is_free(
    conn: &Connection,
    psychologist_id: &Uuid,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: i64,
    exclude: Option<&Uuid>,
) -> Result<bool, DatabaseError> {
    let existing = repository::active_appointments_for_day(conn, psychologist_id, date)?;
    let end = time + Duration::minutes(duration_minutes);

    Ok(!existing
        .iter()
        .filter(|a| Some(&a.id) != exclude)
        .any(|a| {
            let a_end = a.time + Duration::minutes(a.duration_minutes);
            overlaps(a.time, a_end, time, end)
        }))
}

// ─── Day slot query ───────────────────────────────────────────────────────────

/// The ordered slot list for one psychologist on one bookable day.
///
/// Blocked days are rejected with the day's specific reason, and a
/// deactivated psychologist never serves a grid.
pub fn get_day_slots(
    conn: &Connection,
    clock: &impl Clock,
    psychologist_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<SlotView>, SchedulingError> {
    let status = day_status(clock.now(), date);
    if !status.is_available() {
        return Err(SchedulingError::DateUnavailable(status));
    }

    let psychologist = repository::get_psychologist(conn, psychologist_id)?;
    if !psychologist.is_active {
        return Err(SchedulingError::PsychologistInactive {
            id: psychologist.id,
        });
    }

    let existing = repository::active_appointments_for_day(conn, psychologist_id, date)?;
    Ok(mark_grid(&existing))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
