//! Psychologist lifecycle — the active roster and its append-only history.
//!
//! Deactivation never deletes. The row flips to inactive and a history
//! record captures who acted, why, and a JSON snapshot of the profile as it
//! stood before the flip. Reactivation is addressed by that history-record
//! id, so repeat deactivate/reactivate cycles stay unambiguous, and each
//! reactivation appends its own record instead of rewriting anything.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{repository, DatabaseError};
use crate::models::{LifecycleAction, Psychologist, PsychologistHistoryRecord};
use crate::scheduling::{ActorContext, SchedulingError};

// ─── Types ────────────────────────────────────────────────────────────────────

/// Registration request for a new psychologist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePsychologist {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: String,
    #[serde(default)]
    pub is_verified: bool,
}

// ─── Operations ───────────────────────────────────────────────────────────────

/// Register a psychologist. New profiles start active with fresh counters.
pub fn create_psychologist(
    conn: &Connection,
    clock: &impl Clock,
    request: CreatePsychologist,
) -> Result<Psychologist, SchedulingError> {
    if request.full_name.trim().is_empty() {
        return Err(SchedulingError::MissingField { field: "full_name" });
    }
    if request.email.trim().is_empty() {
        return Err(SchedulingError::MissingField { field: "email" });
    }
    if request.specialization.trim().is_empty() {
        return Err(SchedulingError::MissingField {
            field: "specialization",
        });
    }

    let now = clock.now();
    let psychologist = Psychologist {
        id: Uuid::new_v4(),
        full_name: request.full_name,
        email: request.email,
        phone: request.phone,
        specialization: request.specialization,
        is_verified: request.is_verified,
        is_active: true,
        rating: 0.0,
        total_appointments: 0,
        created_at: now,
        updated_at: now,
    };
    repository::insert_psychologist(conn, &psychologist)?;

    tracing::info!(
        psychologist_id = %psychologist.id,
        specialization = %psychologist.specialization,
        "Psychologist registered"
    );
    Ok(psychologist)
}

/// Take a psychologist off the active roster.
///
/// The flag flip and the history record commit together; the record's
/// snapshot preserves the profile as it was while still active, and its id
/// is the handle a later reactivation uses.
pub fn deactivate_psychologist(
    conn: &Connection,
    clock: &impl Clock,
    ctx: &ActorContext,
    id: &Uuid,
    reason: Option<&str>,
) -> Result<PsychologistHistoryRecord, SchedulingError> {
    let now = clock.now();

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    let psychologist = repository::get_psychologist(&tx, id)?;
    if !psychologist.is_active {
        return Err(SchedulingError::AlreadyDeactivated { id: *id });
    }

    repository::set_psychologist_active(&tx, id, false, &now)?;
    let record = history_record(&psychologist, LifecycleAction::Deactivated, reason, ctx, now)?;
    repository::insert_history_record(&tx, &record)?;
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        psychologist_id = %id,
        history_id = %record.id,
        actor = %ctx.actor_id,
        "Psychologist deactivated"
    );
    Ok(record)
}

/// Put a psychologist back on the active roster.
///
/// Addressed by the history-record id rather than the psychologist id, so
/// a profile that has been deactivated more than once is revived from an
/// unambiguous point in its trail.
pub fn reactivate_psychologist(
    conn: &Connection,
    clock: &impl Clock,
    ctx: &ActorContext,
    history_record_id: &Uuid,
    reason: Option<&str>,
) -> Result<Psychologist, SchedulingError> {
    let now = clock.now();

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    let origin = repository::get_history_record(&tx, history_record_id)?;
    let psychologist = repository::get_psychologist(&tx, &origin.psychologist_id)?;
    if psychologist.is_active {
        return Err(SchedulingError::AlreadyActive {
            id: psychologist.id,
        });
    }

    repository::set_psychologist_active(&tx, &psychologist.id, true, &now)?;
    let record = history_record(&psychologist, LifecycleAction::Reactivated, reason, ctx, now)?;
    repository::insert_history_record(&tx, &record)?;
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        psychologist_id = %psychologist.id,
        history_id = %record.id,
        actor = %ctx.actor_id,
        "Psychologist reactivated"
    );
    Ok(repository::get_psychologist(conn, &psychologist.id)?)
}

/// The active roster, alphabetical.
pub fn list_active_psychologists(conn: &Connection) -> Result<Vec<Psychologist>, SchedulingError> {
    Ok(repository::list_active_psychologists(conn)?)
}

/// One psychologist's lifecycle trail, oldest event first.
pub fn list_psychologist_history(
    conn: &Connection,
    psychologist_id: &Uuid,
) -> Result<Vec<PsychologistHistoryRecord>, SchedulingError> {
    Ok(repository::list_psychologist_history(conn, psychologist_id)?)
}

/// The whole lifecycle audit log, newest event first.
pub fn list_history_records(
    conn: &Connection,
) -> Result<Vec<PsychologistHistoryRecord>, SchedulingError> {
    Ok(repository::list_history_records(conn)?)
}

// Snapshot the profile as it stood before the flip.
fn history_record(
    psychologist: &Psychologist,
    action: LifecycleAction,
    reason: Option<&str>,
    ctx: &ActorContext,
    now: chrono::NaiveDateTime,
) -> Result<PsychologistHistoryRecord, SchedulingError> {
    let snapshot = serde_json::to_value(psychologist)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad snapshot JSON: {e}")))?;

    Ok(PsychologistHistoryRecord {
        id: Uuid::new_v4(),
        psychologist_id: psychologist.id,
        action,
        reason: reason.map(str::trim).filter(|r| !r.is_empty()).map(String::from),
        performed_by: ctx.actor_id,
        performed_at: now,
        snapshot,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
