//! Appointment wire document and booking inputs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;
use super::slot::SlotTime;

/// An appointment as stored by the document store. Doctor and patient names
/// are denormalized onto the record at booking time and never re-resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Store-assigned. Empty only on the outgoing create payload.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Queue token shown at the clinic desk, `T` followed by digits.
    pub token_number: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    /// Visit reason as free text ("Consultation", "Follow-up", ...).
    pub appointment_type: String,
    #[serde(default)]
    pub notes: String,
    pub status: AppointmentStatus,
    /// Date and time the appointment held before the latest reschedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_time: Option<SlotTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescheduled_at: Option<DateTime<Utc>>,
    /// Bumped on every mutation; stale-write detection compares against it.
    #[serde(default = "default_version")]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

fn default_version() -> i64 {
    1
}

/// Inputs for booking. Patient identity fields may be left empty when the
/// patient books for themselves; they are filled from the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub appointment_type: String,
    #[serde(default)]
    pub notes: String,
}
