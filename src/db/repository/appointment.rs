use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

use super::{format_time, format_timestamp, parse_date, parse_time, parse_timestamp, parse_uuid};

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, psychologist_id, date, time, duration_minutes, reason, notes,
     status, cancellation_reason, created_at, updated_at";

/// Insert a new appointment row.
///
/// The partial unique index on (psychologist_id, date, time) rejects a second
/// non-cancelled row for the same slot; the raw SQLite error is preserved so
/// the scheduling layer can tell that conflict apart from other failures.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, psychologist_id, date, time,
         duration_minutes, reason, notes, status, cancellation_reason, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.psychologist_id.to_string(),
            appt.date.to_string(),
            format_time(&appt.time),
            appt.duration_minutes,
            appt.reason,
            appt.notes,
            appt.status.as_str(),
            appt.cancellation_reason,
            format_timestamp(&appt.created_at),
            format_timestamp(&appt.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
        params![id.to_string()],
        map_appointment_row,
    );

    match result {
        Ok(row) => appointment_from_row(row),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(DatabaseError::not_found("appointment", id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Non-cancelled appointments for one psychologist on one day, earliest first.
/// This is the occupancy set the slot allocator marks the grid against.
pub fn active_appointments_for_day(
    conn: &Connection,
    psychologist_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE psychologist_id = ?1 AND date = ?2 AND status != 'cancelled'
         ORDER BY time ASC"
    ))?;

    let rows = stmt.query_map(
        params![psychologist_id.to_string(), date.to_string()],
        map_appointment_row,
    )?;
    collect_appointments(rows)
}

/// Everything a patient has booked, most recent slot first.
pub fn list_appointments_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE patient_id = ?1 ORDER BY date DESC, time DESC"
    ))?;

    let rows = stmt.query_map(params![patient_id.to_string()], map_appointment_row)?;
    collect_appointments(rows)
}

/// A psychologist's appointments: the full book, or one day's agenda.
pub fn list_appointments_for_psychologist(
    conn: &Connection,
    psychologist_id: &Uuid,
    on_date: Option<NaiveDate>,
) -> Result<Vec<Appointment>, DatabaseError> {
    match on_date {
        Some(date) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE psychologist_id = ?1 AND date = ?2 ORDER BY time ASC"
            ))?;
            let rows = stmt.query_map(
                params![psychologist_id.to_string(), date.to_string()],
                map_appointment_row,
            )?;
            collect_appointments(rows)
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE psychologist_id = ?1 ORDER BY date DESC, time DESC"
            ))?;
            let rows = stmt.query_map(params![psychologist_id.to_string()], map_appointment_row)?;
            collect_appointments(rows)
        }
    }
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: &AppointmentStatus,
    cancellation_reason: Option<&str>,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments
         SET status = ?2, cancellation_reason = ?3, updated_at = ?4
         WHERE id = ?1",
        params![
            id.to_string(),
            status.as_str(),
            cancellation_reason,
            format_timestamp(updated_at),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("appointment", id));
    }
    Ok(())
}

/// Move an appointment to a new slot in place; the id never changes.
pub fn update_appointment_slot(
    conn: &Connection,
    id: &Uuid,
    new_date: NaiveDate,
    new_time: NaiveTime,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET date = ?2, time = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            id.to_string(),
            new_date.to_string(),
            format_time(&new_time),
            format_timestamp(updated_at),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("appointment", id));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Reschedule audit trail
// ═══════════════════════════════════════════

pub fn insert_reschedule(
    conn: &Connection,
    rec: &AppointmentReschedule,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointment_reschedules
         (id, appointment_id, previous_date, previous_time, new_date, new_time,
          performed_by, performed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            rec.id.to_string(),
            rec.appointment_id.to_string(),
            rec.previous_date.to_string(),
            format_time(&rec.previous_time),
            rec.new_date.to_string(),
            format_time(&rec.new_time),
            rec.performed_by.to_string(),
            format_timestamp(&rec.performed_at),
        ],
    )?;
    Ok(())
}

/// Slot changes for one appointment, oldest first.
pub fn list_reschedules_for_appointment(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<AppointmentReschedule>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, appointment_id, previous_date, previous_time, new_date, new_time,
                performed_by, performed_at
         FROM appointment_reschedules WHERE appointment_id = ?1
         ORDER BY performed_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![appointment_id.to_string()], |row| {
        Ok(RescheduleRow {
            id: row.get(0)?,
            appointment_id: row.get(1)?,
            previous_date: row.get(2)?,
            previous_time: row.get(3)?,
            new_date: row.get(4)?,
            new_time: row.get(5)?,
            performed_by: row.get(6)?,
            performed_at: row.get(7)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(reschedule_from_row(row?)?);
    }
    Ok(out)
}

// ═══════════════════════════════════════════
// Internal row mapping
// ═══════════════════════════════════════════

struct AppointmentRow {
    id: String,
    patient_id: String,
    psychologist_id: String,
    date: String,
    time: String,
    duration_minutes: i64,
    reason: String,
    notes: Option<String>,
    status: String,
    cancellation_reason: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_appointment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        psychologist_id: row.get(2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        duration_minutes: row.get(5)?,
        reason: row.get(6)?,
        notes: row.get(7)?,
        status: row.get(8)?,
        cancellation_reason: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        psychologist_id: parse_uuid(&row.psychologist_id)?,
        date: parse_date(&row.date)?,
        time: parse_time(&row.time)?,
        duration_minutes: row.duration_minutes,
        reason: row.reason,
        notes: row.notes,
        status: AppointmentStatus::from_str(&row.status)?,
        cancellation_reason: row.cancellation_reason,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

fn collect_appointments(
    rows: impl Iterator<Item = rusqlite::Result<AppointmentRow>>,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(appointment_from_row(row?)?);
    }
    Ok(out)
}

struct RescheduleRow {
    id: String,
    appointment_id: String,
    previous_date: String,
    previous_time: String,
    new_date: String,
    new_time: String,
    performed_by: String,
    performed_at: String,
}

fn reschedule_from_row(row: RescheduleRow) -> Result<AppointmentReschedule, DatabaseError> {
    Ok(AppointmentReschedule {
        id: parse_uuid(&row.id)?,
        appointment_id: parse_uuid(&row.appointment_id)?,
        previous_date: parse_date(&row.previous_date)?,
        previous_time: parse_time(&row.previous_time)?,
        new_date: parse_date(&row.new_date)?,
        new_time: parse_time(&row.new_time)?,
        performed_by: parse_uuid(&row.performed_by)?,
        performed_at: parse_timestamp(&row.performed_at),
    })
}
