use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub psychologist_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i64,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    /// Scheduled start as a single point in institutional time.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Scheduled end, start plus duration.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at() + Duration::minutes(self.duration_minutes)
    }
}

/// Append-only audit row linking an appointment to the slot it vacated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentReschedule {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub previous_date: NaiveDate,
    pub previous_time: NaiveTime,
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
    pub performed_by: Uuid,
    pub performed_at: NaiveDateTime,
}
