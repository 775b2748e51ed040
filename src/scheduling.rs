//! Appointment engine — booking, the status state machine, and rescheduling.
//!
//! Two entry paths create appointments: patient booking starts `pending`
//! and waits for staff approval; staff direct scheduling starts `confirmed`.
//! From there every status change goes through one transition table, and a
//! reschedule moves a confirmed appointment in place while an audit row
//! records where it came from.
//!
//! All writes are transactional: the occupancy check, the row mutation and
//! any side effect (the completion counter, the reschedule trail) commit
//! together or not at all. The partial unique index on
//! `(psychologist_id, date, time)` backstops the in-transaction check, so
//! two racing bookings can never both land.

use chrono::{Duration, NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::availability;
use crate::clock::Clock;
use crate::config;
use crate::db::{is_unique_violation, repository, DatabaseError};
use crate::models::{Appointment, AppointmentStatus, DayStatus};
use crate::slots;

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Everything the scheduling engine can refuse to do, and why.
#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("no such calendar month: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("date is not bookable: {}", .0.as_str())]
    DateUnavailable(DayStatus),

    #[error("time {time} is not on the booking grid")]
    InvalidTime { time: NaiveTime },

    #[error("{field} must not be empty")]
    MissingField { field: &'static str },

    #[error("rejecting an appointment requires a reason")]
    ReasonRequired,

    #[error("psychologist {id} is deactivated")]
    PsychologistInactive { id: Uuid },

    #[error("slot {date} {time} is already booked")]
    SlotOccupied { date: NaiveDate, time: NaiveTime },

    #[error("cannot move appointment from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("only confirmed appointments can be rescheduled (status: {})", .0.as_str())]
    RescheduleNotConfirmed(AppointmentStatus),

    #[error("reschedules need at least {hours_required} hours of notice")]
    RescheduleNotice { hours_required: i64 },

    #[error("reschedule target must be tomorrow or later")]
    RescheduleTooSoon,

    #[error("psychologist {id} is already deactivated")]
    AlreadyDeactivated { id: Uuid },

    #[error("psychologist {id} is already active")]
    AlreadyActive { id: Uuid },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ─── Types ────────────────────────────────────────────────────────────────────

/// Who is performing a mutating operation. Threaded into every audit row.
#[derive(Debug, Clone, Copy)]
pub struct ActorContext {
    pub actor_id: Uuid,
}

impl ActorContext {
    pub fn new(actor_id: Uuid) -> Self {
        Self { actor_id }
    }
}

/// Booking request. `direct` is the staff path that enters the state
/// machine already confirmed; patient bookings leave it false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointment {
    pub patient_id: Uuid,
    pub psychologist_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub direct: bool,
}

// ─── State machine ────────────────────────────────────────────────────────────

/// The statuses an appointment may move to from `from`. Terminal statuses
/// return an empty slice.
pub fn valid_transitions(from: &AppointmentStatus) -> &'static [AppointmentStatus] {
    match from {
        AppointmentStatus::Pending => &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
        AppointmentStatus::Confirmed => {
            &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
        }
        AppointmentStatus::Completed | AppointmentStatus::Cancelled => &[],
    }
}

fn check_transition(
    from: &AppointmentStatus,
    to: &AppointmentStatus,
) -> Result<(), SchedulingError> {
    if valid_transitions(from).contains(to) {
        Ok(())
    } else {
        Err(SchedulingError::InvalidTransition {
            from: from.clone(),
            to: to.clone(),
        })
    }
}

// ─── Operations ───────────────────────────────────────────────────────────────

/// Book a slot.
///
/// The target day must pass every availability rule, the time must lie on
/// the grid, and the full session interval must be free. The freedom check
/// and the insert share one transaction; if a concurrent writer slips in
/// between them the unique index turns the insert into `SlotOccupied`
/// instead of a stored double booking.
pub fn create_appointment(
    conn: &Connection,
    clock: &impl Clock,
    ctx: &ActorContext,
    request: CreateAppointment,
) -> Result<Appointment, SchedulingError> {
    let now = clock.now();

    let day = availability::day_status(now, request.date);
    if !day.is_available() {
        return Err(SchedulingError::DateUnavailable(day));
    }
    if !slots::is_grid_time(request.time) {
        return Err(SchedulingError::InvalidTime { time: request.time });
    }
    if request.reason.trim().is_empty() {
        return Err(SchedulingError::MissingField { field: "reason" });
    }

    let psychologist = repository::get_psychologist(conn, &request.psychologist_id)?;
    if !psychologist.is_active {
        return Err(SchedulingError::PsychologistInactive {
            id: psychologist.id,
        });
    }

    let status = if request.direct {
        AppointmentStatus::Confirmed
    } else {
        AppointmentStatus::Pending
    };

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: request.patient_id,
        psychologist_id: request.psychologist_id,
        date: request.date,
        time: request.time,
        duration_minutes: config::APPOINTMENT_MINUTES,
        reason: request.reason,
        notes: request.notes,
        status,
        cancellation_reason: None,
        created_at: now,
        updated_at: now,
    };

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    if !slots::interval_is_free(
        &tx,
        &appointment.psychologist_id,
        appointment.date,
        appointment.time,
        appointment.duration_minutes,
        None,
    )? {
        return Err(SchedulingError::SlotOccupied {
            date: appointment.date,
            time: appointment.time,
        });
    }
    match repository::insert_appointment(&tx, &appointment) {
        Ok(()) => {}
        Err(DatabaseError::Sqlite(ref cause)) if is_unique_violation(cause) => {
            return Err(SchedulingError::SlotOccupied {
                date: appointment.date,
                time: appointment.time,
            });
        }
        Err(other) => return Err(other.into()),
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        appointment_id = %appointment.id,
        psychologist_id = %appointment.psychologist_id,
        date = %appointment.date,
        time = %appointment.time,
        status = appointment.status.as_str(),
        actor = %ctx.actor_id,
        "Appointment created"
    );
    Ok(appointment)
}

/// Move an appointment to `target` through the transition table.
///
/// A pending appointment rejected by staff (pending to cancelled) must
/// carry a reason; cancelling a confirmed appointment may. Completing an
/// appointment bumps the psychologist's completed-session counter in the
/// same transaction.
pub fn transition_appointment(
    conn: &Connection,
    clock: &impl Clock,
    ctx: &ActorContext,
    id: &Uuid,
    target: AppointmentStatus,
    reason: Option<&str>,
) -> Result<Appointment, SchedulingError> {
    let now = clock.now();
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    let current = repository::get_appointment(&tx, id)?;
    check_transition(&current.status, &target)?;

    if current.status == AppointmentStatus::Pending
        && target == AppointmentStatus::Cancelled
        && reason.is_none()
    {
        return Err(SchedulingError::ReasonRequired);
    }

    let cancellation_reason = if target == AppointmentStatus::Cancelled {
        reason
    } else {
        None
    };
    repository::update_appointment_status(&tx, id, &target, cancellation_reason, &now)?;

    if target == AppointmentStatus::Completed {
        repository::increment_appointment_count(&tx, &current.psychologist_id, &now)?;
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        appointment_id = %id,
        from = current.status.as_str(),
        to = target.as_str(),
        actor = %ctx.actor_id,
        "Appointment transitioned"
    );
    Ok(repository::get_appointment(conn, id)?)
}

/// Move a confirmed appointment to a new slot, keeping its identity.
///
/// Needs 24 hours of notice measured against the current slot, and the
/// target must be an available day no earlier than tomorrow with the full
/// session interval free. The slot update and the audit row commit
/// together.
pub fn reschedule_appointment(
    conn: &Connection,
    clock: &impl Clock,
    ctx: &ActorContext,
    id: &Uuid,
    new_date: NaiveDate,
    new_time: NaiveTime,
) -> Result<Appointment, SchedulingError> {
    let now = clock.now();

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    let current = repository::get_appointment(&tx, id)?;
    if current.status != AppointmentStatus::Confirmed {
        return Err(SchedulingError::RescheduleNotConfirmed(current.status));
    }

    let notice = Duration::hours(config::RESCHEDULE_NOTICE_HOURS);
    if now + notice > current.starts_at() {
        return Err(SchedulingError::RescheduleNotice {
            hours_required: config::RESCHEDULE_NOTICE_HOURS,
        });
    }

    let day = availability::day_status(now, new_date);
    if !day.is_available() {
        return Err(SchedulingError::DateUnavailable(day));
    }
    // An available today is still too soon for a reschedule target
    if new_date <= now.date() {
        return Err(SchedulingError::RescheduleTooSoon);
    }
    if !slots::is_grid_time(new_time) {
        return Err(SchedulingError::InvalidTime { time: new_time });
    }
    if !slots::interval_is_free(
        &tx,
        &current.psychologist_id,
        new_date,
        new_time,
        current.duration_minutes,
        Some(id),
    )? {
        return Err(SchedulingError::SlotOccupied {
            date: new_date,
            time: new_time,
        });
    }

    match repository::update_appointment_slot(&tx, id, new_date, new_time, &now) {
        Ok(()) => {}
        Err(DatabaseError::Sqlite(ref cause)) if is_unique_violation(cause) => {
            return Err(SchedulingError::SlotOccupied {
                date: new_date,
                time: new_time,
            });
        }
        Err(other) => return Err(other.into()),
    }
    repository::insert_reschedule(
        &tx,
        &crate::models::AppointmentReschedule {
            id: Uuid::new_v4(),
            appointment_id: *id,
            previous_date: current.date,
            previous_time: current.time,
            new_date,
            new_time,
            performed_by: ctx.actor_id,
            performed_at: now,
        },
    )?;
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        appointment_id = %id,
        from_date = %current.date,
        from_time = %current.time,
        to_date = %new_date,
        to_time = %new_time,
        actor = %ctx.actor_id,
        "Appointment rescheduled"
    );
    Ok(repository::get_appointment(conn, id)?)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::sqlite::open_memory_database;
    use rusqlite::params;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Wednesday 2024-01-10, 09:00 institutional time
    fn clock() -> FixedClock {
        FixedClock::at(2024, 1, 10, 9, 0)
    }

    fn ctx() -> ActorContext {
        ActorContext::new(Uuid::new_v4())
    }

    fn seed_psychologist(conn: &Connection, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO psychologists (id, full_name, email, specialization, is_active, created_at, updated_at)
             VALUES (?1, 'Dr. Ibarra', ?2, 'Clinical', ?3, '2024-01-01 08:00:00', '2024-01-01 08:00:00')",
            params![id.to_string(), format!("{id}@institute.edu"), active as i32],
        )
        .unwrap();
        id
    }

    fn booking(psychologist_id: Uuid, d: NaiveDate, t: NaiveTime) -> CreateAppointment {
        CreateAppointment {
            patient_id: Uuid::new_v4(),
            psychologist_id,
            date: d,
            time: t,
            reason: "Anxiety consultation".into(),
            notes: None,
            direct: false,
        }
    }

    fn direct(psychologist_id: Uuid, d: NaiveDate, t: NaiveTime) -> CreateAppointment {
        CreateAppointment {
            direct: true,
            ..booking(psychologist_id, d, t)
        }
    }

    // ─── Booking ───

    #[test]
    fn test_patient_booking_starts_pending() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();

        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.duration_minutes, 45);

        let stored = repository::get_appointment(&conn, &appt.id).unwrap();
        assert_eq!(stored.status, AppointmentStatus::Pending);
        assert_eq!(stored.date, date(2024, 1, 15));
    }

    #[test]
    fn test_direct_scheduling_starts_confirmed() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            direct(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn test_booking_rejects_weekend() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        // Jan 13 is a Saturday
        let err = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 13), time(9, 0)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::DateUnavailable(DayStatus::BlockedWeekend)
        ));
    }

    #[test]
    fn test_booking_rejects_today_after_cutoff() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let afternoon = FixedClock::at(2024, 1, 10, 14, 0);

        let err = create_appointment(
            &conn,
            &afternoon,
            &ctx(),
            booking(psy, date(2024, 1, 10), time(15, 0)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::DateUnavailable(DayStatus::BlockedPastCutoffToday)
        ));
    }

    #[test]
    fn test_booking_rejects_beyond_horizon() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let err = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 25), time(9, 0)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::DateUnavailable(DayStatus::BlockedBeyondHorizon)
        ));
    }

    #[test]
    fn test_booking_rejects_off_grid_time() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let err = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 15), time(9, 15)),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidTime { .. }));
    }

    #[test]
    fn test_booking_requires_reason() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let mut request = booking(psy, date(2024, 1, 15), time(9, 0));
        request.reason = "   ".into();
        let err = create_appointment(&conn, &clock(), &ctx(), request).unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::MissingField { field: "reason" }
        ));
    }

    #[test]
    fn test_booking_rejects_deactivated_psychologist() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, false);

        let err = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::PsychologistInactive { id } if id == psy));
    }

    #[test]
    fn test_double_booking_is_refused() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let day = date(2024, 1, 15);

        create_appointment(&conn, &clock(), &ctx(), booking(psy, day, time(9, 0))).unwrap();
        let err = create_appointment(&conn, &clock(), &ctx(), booking(psy, day, time(9, 0)))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::SlotOccupied { .. }));

        // Exactly one booking survived
        let stored = repository::active_appointments_for_day(&conn, &psy, day).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_overlap_blocks_the_neighbouring_slot() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let day = date(2024, 1, 15);

        create_appointment(&conn, &clock(), &ctx(), booking(psy, day, time(9, 0))).unwrap();

        // 09:30 falls inside the 09:00 session's 45 minutes
        let err = create_appointment(&conn, &clock(), &ctx(), booking(psy, day, time(9, 30)))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::SlotOccupied { .. }));

        // 10:00 is clear of it
        create_appointment(&conn, &clock(), &ctx(), booking(psy, day, time(10, 0))).unwrap();
    }

    // ─── Status transitions ───

    #[test]
    fn test_approval_confirms_a_pending_booking() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();
        let updated = transition_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            AppointmentStatus::Confirmed,
            None,
        )
        .unwrap();

        assert_eq!(updated.status, AppointmentStatus::Confirmed);
        assert_eq!(updated.id, appt.id);
    }

    #[test]
    fn test_rejection_requires_a_reason() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();

        let err = transition_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            AppointmentStatus::Cancelled,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::ReasonRequired));

        // Whitespace is not a reason either
        let err = transition_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            AppointmentStatus::Cancelled,
            Some("  "),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::ReasonRequired));

        let updated = transition_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            AppointmentStatus::Cancelled,
            Some("No staff available that day"),
        )
        .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Cancelled);
        assert_eq!(
            updated.cancellation_reason.as_deref(),
            Some("No staff available that day")
        );
    }

    #[test]
    fn test_cancelling_confirmed_needs_no_reason() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            direct(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();
        let updated = transition_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            AppointmentStatus::Cancelled,
            None,
        )
        .unwrap();

        assert_eq!(updated.status, AppointmentStatus::Cancelled);
        assert_eq!(updated.cancellation_reason, None);
    }

    #[test]
    fn test_completion_increments_the_psychologist_counter() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            direct(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();
        transition_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            AppointmentStatus::Completed,
            None,
        )
        .unwrap();

        let stored = repository::get_psychologist(&conn, &psy).unwrap();
        assert_eq!(stored.total_appointments, 1);
    }

    #[test]
    fn test_pending_cannot_complete_directly() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();
        let err = transition_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            AppointmentStatus::Completed,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::InvalidTransition {
                from: AppointmentStatus::Pending,
                to: AppointmentStatus::Completed,
            }
        ));
    }

    #[test]
    fn test_terminal_statuses_accept_nothing() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            direct(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();
        transition_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            AppointmentStatus::Completed,
            None,
        )
        .unwrap();

        for target in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
        ] {
            let err = transition_appointment(&conn, &clock(), &ctx(), &appt.id, target, None)
                .unwrap_err();
            assert!(matches!(err, SchedulingError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(
            valid_transitions(&AppointmentStatus::Pending),
            &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
        );
        assert_eq!(
            valid_transitions(&AppointmentStatus::Confirmed),
            &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
        );
        assert!(valid_transitions(&AppointmentStatus::Completed).is_empty());
        assert!(valid_transitions(&AppointmentStatus::Cancelled).is_empty());
    }

    // ─── Rescheduling ───

    /// Confirmed appointment on Monday 2024-01-15 at 09:00.
    fn confirmed_monday_appointment(conn: &Connection, psy: Uuid) -> Appointment {
        create_appointment(
            conn,
            &clock(),
            &ctx(),
            direct(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap()
    }

    #[test]
    fn test_reschedule_moves_the_slot_and_leaves_a_trail() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let appt = confirmed_monday_appointment(&conn, psy);

        // 30 hours before the appointment
        let early = FixedClock::at(2024, 1, 14, 3, 0);
        let moved = reschedule_appointment(
            &conn,
            &early,
            &ctx(),
            &appt.id,
            date(2024, 1, 16),
            time(10, 0),
        )
        .unwrap();

        assert_eq!(moved.id, appt.id);
        assert_eq!(moved.date, date(2024, 1, 16));
        assert_eq!(moved.time, time(10, 0));
        assert_eq!(moved.status, AppointmentStatus::Confirmed);

        let trail = repository::list_reschedules_for_appointment(&conn, &appt.id).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].previous_date, date(2024, 1, 15));
        assert_eq!(trail[0].previous_time, time(9, 0));
        assert_eq!(trail[0].new_date, date(2024, 1, 16));
        assert_eq!(trail[0].new_time, time(10, 0));
    }

    #[test]
    fn test_reschedule_needs_24_hours_of_notice() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let appt = confirmed_monday_appointment(&conn, psy);

        // 20 hours before the appointment
        let late = FixedClock::at(2024, 1, 14, 13, 0);
        let err = reschedule_appointment(
            &conn,
            &late,
            &ctx(),
            &appt.id,
            date(2024, 1, 16),
            time(10, 0),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::RescheduleNotice { hours_required: 24 }
        ));

        // Nothing moved and no trail was written
        let stored = repository::get_appointment(&conn, &appt.id).unwrap();
        assert_eq!(stored.date, date(2024, 1, 15));
        assert_eq!(stored.time, time(9, 0));
        let trail = repository::list_reschedules_for_appointment(&conn, &appt.id).unwrap();
        assert!(trail.is_empty());
    }

    #[test]
    fn test_reschedule_at_the_exact_notice_boundary_is_allowed() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let appt = confirmed_monday_appointment(&conn, psy);

        // Exactly 24 hours before the appointment
        let boundary = FixedClock::at(2024, 1, 14, 9, 0);
        reschedule_appointment(
            &conn,
            &boundary,
            &ctx(),
            &appt.id,
            date(2024, 1, 16),
            time(10, 0),
        )
        .unwrap();
    }

    #[test]
    fn test_reschedule_only_applies_to_confirmed() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            booking(psy, date(2024, 1, 15), time(9, 0)),
        )
        .unwrap();
        let err = reschedule_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            date(2024, 1, 16),
            time(10, 0),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::RescheduleNotConfirmed(AppointmentStatus::Pending)
        ));
    }

    #[test]
    fn test_reschedule_target_must_be_tomorrow_or_later() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);

        // Confirmed for Tuesday Jan 16; plenty of notice from Jan 10
        let appt = create_appointment(
            &conn,
            &clock(),
            &ctx(),
            direct(psy, date(2024, 1, 16), time(9, 0)),
        )
        .unwrap();

        // Today (Jan 10, before cutoff) is an available day, but still too soon
        let err = reschedule_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            date(2024, 1, 10),
            time(15, 0),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::RescheduleTooSoon));
    }

    #[test]
    fn test_reschedule_rejects_blocked_target_day() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let appt = confirmed_monday_appointment(&conn, psy);

        // Jan 20 is a Saturday
        let err = reschedule_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            date(2024, 1, 20),
            time(10, 0),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::DateUnavailable(DayStatus::BlockedWeekend)
        ));
    }

    #[test]
    fn test_reschedule_rejects_off_grid_time() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let appt = confirmed_monday_appointment(&conn, psy);

        let err = reschedule_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            date(2024, 1, 16),
            time(10, 20),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidTime { .. }));
    }

    #[test]
    fn test_reschedule_to_an_occupied_slot_is_refused() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let appt = confirmed_monday_appointment(&conn, psy);
        create_appointment(
            &conn,
            &clock(),
            &ctx(),
            direct(psy, date(2024, 1, 16), time(10, 0)),
        )
        .unwrap();

        // 10:30 is still inside the Jan 16 10:00 session
        let err = reschedule_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            date(2024, 1, 16),
            time(10, 30),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulingError::SlotOccupied { .. }));
    }

    #[test]
    fn test_reschedule_may_shift_within_its_own_day() {
        let conn = open_memory_database().unwrap();
        let psy = seed_psychologist(&conn, true);
        let appt = confirmed_monday_appointment(&conn, psy);

        // Moving 09:00 to 09:30 collides only with itself, which does not count
        let moved = reschedule_appointment(
            &conn,
            &clock(),
            &ctx(),
            &appt.id,
            date(2024, 1, 15),
            time(9, 30),
        )
        .unwrap();
        assert_eq!(moved.time, time(9, 30));
    }
}
