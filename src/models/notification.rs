//! Notification documents for the in-app feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::NotificationKind;

/// A stored notification, addressed to exactly one patient or one doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification about to be written; the store assigns the id. The
/// constructors keep the exactly-one-addressee rule intact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    pub fn for_patient(patient_id: &str, kind: NotificationKind, title: &str, message: &str) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            doctor_id: None,
            title: title.into(),
            message: message.into(),
            kind,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn for_doctor(doctor_id: &str, kind: NotificationKind, title: &str, message: &str) -> Self {
        Self {
            patient_id: None,
            doctor_id: Some(doctor_id.into()),
            title: title.into(),
            message: message.into(),
            kind,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Addressee of a notification query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTarget<'a> {
    Patient(&'a str),
    Doctor(&'a str),
}

impl NotificationTarget<'_> {
    pub(crate) fn field(&self) -> &'static str {
        match self {
            Self::Patient(_) => "patientId",
            Self::Doctor(_) => "doctorId",
        }
    }

    pub(crate) fn id(&self) -> &str {
        match self {
            Self::Patient(id) | Self::Doctor(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drafts_address_exactly_one_party() {
        let to_patient = NewNotification::for_patient(
            "pat-1",
            NotificationKind::AppointmentBooked,
            "Appointment booked",
            "Booked for 2026-03-10 at 10:00 AM.",
        );
        assert_eq!(to_patient.patient_id.as_deref(), Some("pat-1"));
        assert!(to_patient.doctor_id.is_none());
        assert!(!to_patient.read);

        let to_doctor = NewNotification::for_doctor(
            "doc-1",
            NotificationKind::NewAppointment,
            "New appointment",
            "Asha Rao is scheduled.",
        );
        assert!(to_doctor.patient_id.is_none());
        assert_eq!(to_doctor.doctor_id.as_deref(), Some("doc-1"));
    }

    #[test]
    fn kind_serializes_under_the_type_key() {
        let draft = NewNotification::for_patient(
            "pat-1",
            NotificationKind::AppointmentCancelled,
            "Cancelled",
            "Your appointment was cancelled.",
        );
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["type"], "appointment_cancelled");
        assert!(json.get("doctorId").is_none());
        assert_eq!(json["patientId"], "pat-1");
    }

    #[test]
    fn target_maps_to_wire_field() {
        let target = NotificationTarget::Patient("pat-7");
        assert_eq!(target.field(), "patientId");
        assert_eq!(target.id(), "pat-7");
        assert_eq!(NotificationTarget::Doctor("doc-7").field(), "doctorId");
    }
}
