use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{is_unique_violation, DatabaseError};
use crate::models::*;

use super::{format_timestamp, parse_timestamp, parse_uuid};

const PSYCHOLOGIST_COLUMNS: &str =
    "id, full_name, email, phone, specialization, is_verified, is_active,
     rating, total_appointments, created_at, updated_at";

pub fn insert_psychologist(conn: &Connection, psy: &Psychologist) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO psychologists (id, full_name, email, phone, specialization,
         is_verified, is_active, rating, total_appointments, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            psy.id.to_string(),
            psy.full_name,
            psy.email,
            psy.phone,
            psy.specialization,
            psy.is_verified as i32,
            psy.is_active as i32,
            psy.rating,
            psy.total_appointments,
            format_timestamp(&psy.created_at),
            format_timestamp(&psy.updated_at),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            DatabaseError::ConstraintViolation(format!(
                "email already registered: {}",
                psy.email
            ))
        } else {
            DatabaseError::Sqlite(e)
        }
    })?;
    Ok(())
}

pub fn get_psychologist(conn: &Connection, id: &Uuid) -> Result<Psychologist, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {PSYCHOLOGIST_COLUMNS} FROM psychologists WHERE id = ?1"),
        params![id.to_string()],
        map_psychologist_row,
    );

    match result {
        Ok(row) => psychologist_from_row(row),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(DatabaseError::not_found("psychologist", id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Active listing — the only population the slot allocator draws from.
pub fn list_active_psychologists(conn: &Connection) -> Result<Vec<Psychologist>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PSYCHOLOGIST_COLUMNS} FROM psychologists
         WHERE is_active = 1 ORDER BY full_name ASC"
    ))?;

    let rows = stmt.query_map([], map_psychologist_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(psychologist_from_row(row?)?);
    }
    Ok(out)
}

/// Flip the active flag. The caller records the matching history entry in the
/// same transaction.
pub fn set_psychologist_active(
    conn: &Connection,
    id: &Uuid,
    active: bool,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE psychologists SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), active as i32, format_timestamp(updated_at)],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("psychologist", id));
    }
    Ok(())
}

pub fn increment_appointment_count(
    conn: &Connection,
    id: &Uuid,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE psychologists
         SET total_appointments = total_appointments + 1, updated_at = ?2
         WHERE id = ?1",
        params![id.to_string(), format_timestamp(updated_at)],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("psychologist", id));
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Lifecycle history
// ═══════════════════════════════════════════

pub fn insert_history_record(
    conn: &Connection,
    rec: &PsychologistHistoryRecord,
) -> Result<(), DatabaseError> {
    let snapshot = serde_json::to_string(&rec.snapshot)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad snapshot JSON: {e}")))?;

    conn.execute(
        "INSERT INTO psychologist_history
         (id, psychologist_id, action, reason, performed_by, performed_at, snapshot)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            rec.id.to_string(),
            rec.psychologist_id.to_string(),
            rec.action.as_str(),
            rec.reason,
            rec.performed_by.to_string(),
            format_timestamp(&rec.performed_at),
            snapshot,
        ],
    )?;
    Ok(())
}

pub fn get_history_record(
    conn: &Connection,
    id: &Uuid,
) -> Result<PsychologistHistoryRecord, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, psychologist_id, action, reason, performed_by, performed_at, snapshot
         FROM psychologist_history WHERE id = ?1",
        params![id.to_string()],
        map_history_row,
    );

    match result {
        Ok(row) => history_from_row(row),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(DatabaseError::not_found("psychologist_history", id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Full audit log, newest event first.
pub fn list_history_records(
    conn: &Connection,
) -> Result<Vec<PsychologistHistoryRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, psychologist_id, action, reason, performed_by, performed_at, snapshot
         FROM psychologist_history ORDER BY performed_at DESC, rowid DESC",
    )?;

    let rows = stmt.query_map([], map_history_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(history_from_row(row?)?);
    }
    Ok(out)
}

/// One psychologist's trail, oldest event first.
pub fn list_psychologist_history(
    conn: &Connection,
    psychologist_id: &Uuid,
) -> Result<Vec<PsychologistHistoryRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, psychologist_id, action, reason, performed_by, performed_at, snapshot
         FROM psychologist_history WHERE psychologist_id = ?1
         ORDER BY performed_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![psychologist_id.to_string()], map_history_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(history_from_row(row?)?);
    }
    Ok(out)
}

// ═══════════════════════════════════════════
// Internal row mapping
// ═══════════════════════════════════════════

struct PsychologistRow {
    id: String,
    full_name: String,
    email: String,
    phone: Option<String>,
    specialization: String,
    is_verified: i32,
    is_active: i32,
    rating: f64,
    total_appointments: i32,
    created_at: String,
    updated_at: String,
}

fn map_psychologist_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PsychologistRow> {
    Ok(PsychologistRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        specialization: row.get(4)?,
        is_verified: row.get(5)?,
        is_active: row.get(6)?,
        rating: row.get(7)?,
        total_appointments: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn psychologist_from_row(row: PsychologistRow) -> Result<Psychologist, DatabaseError> {
    Ok(Psychologist {
        id: parse_uuid(&row.id)?,
        full_name: row.full_name,
        email: row.email,
        phone: row.phone,
        specialization: row.specialization,
        is_verified: row.is_verified != 0,
        is_active: row.is_active != 0,
        rating: row.rating,
        total_appointments: row.total_appointments,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

struct HistoryRow {
    id: String,
    psychologist_id: String,
    action: String,
    reason: Option<String>,
    performed_by: String,
    performed_at: String,
    snapshot: String,
}

fn map_history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok(HistoryRow {
        id: row.get(0)?,
        psychologist_id: row.get(1)?,
        action: row.get(2)?,
        reason: row.get(3)?,
        performed_by: row.get(4)?,
        performed_at: row.get(5)?,
        snapshot: row.get(6)?,
    })
}

fn history_from_row(row: HistoryRow) -> Result<PsychologistHistoryRecord, DatabaseError> {
    let snapshot: serde_json::Value = serde_json::from_str(&row.snapshot)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad snapshot JSON: {e}")))?;

    Ok(PsychologistHistoryRecord {
        id: parse_uuid(&row.id)?,
        psychologist_id: parse_uuid(&row.psychologist_id)?,
        action: LifecycleAction::from_str(&row.action)?,
        reason: row.reason,
        performed_by: parse_uuid(&row.performed_by)?,
        performed_at: parse_timestamp(&row.performed_at),
        snapshot,
    })
}
