use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::LifecycleAction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Psychologist {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub rating: f64,
    pub total_appointments: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Append-only audit entry for one deactivation or reactivation event.
///
/// `snapshot` captures the psychologist record as it stood when the event
/// was recorded, so the history stays meaningful even after later edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsychologistHistoryRecord {
    pub id: Uuid,
    pub psychologist_id: Uuid,
    pub action: LifecycleAction,
    pub reason: Option<String>,
    pub performed_by: Uuid,
    pub performed_at: NaiveDateTime,
    pub snapshot: serde_json::Value,
}
