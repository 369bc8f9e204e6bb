//! Prescription documents linked to appointments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PrescriptionStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub appointment_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    /// Ordered as written; order carries meaning to the prescriber.
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub notes: String,
    pub status: PrescriptionStatus,
    pub prescribed_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_follow_up: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// One medicine line. Dosing is free text; no interaction or dose checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default)]
    pub instructions: String,
}

/// Medicine line as entered by the doctor, before an id is assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineEntry {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default)]
    pub instructions: String,
}

impl MedicineEntry {
    pub(crate) fn into_medicine(self) -> Medicine {
        Medicine {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            dosage: self.dosage,
            frequency: self.frequency,
            duration: self.duration,
            instructions: self.instructions,
        }
    }
}

/// Inputs for creating or replacing a prescription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionDraft {
    pub appointment_id: String,
    pub medicines: Vec<MedicineEntry>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub next_follow_up: Option<NaiveDate>,
}
