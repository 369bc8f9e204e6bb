//! Prescriptions issued against appointments.
//!
//! A prescription links to exactly one appointment and denormalizes the
//! patient and doctor names from it. Edits go through full-document
//! replacement; only the status moves through a partial update.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::models::{
    Appointment, AppointmentStatus, Medicine, MedicineEntry, Prescription, PrescriptionDraft,
    PrescriptionStatus,
};
use crate::session::SessionContext;
use crate::store::{self, EntityStore, ListQuery};

/// What to do when the linked appointment is not completed yet.
///
/// The booking desk habitually writes prescriptions during the visit, so
/// the default only warns. `RequireCompleted` turns the rule into a hard
/// validation error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrescriptionPolicy {
    #[default]
    WarnOnly,
    RequireCompleted,
}

pub struct PrescriptionService {
    store: Arc<dyn EntityStore>,
    policy: PrescriptionPolicy,
}

impl PrescriptionService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self::with_policy(store, PrescriptionPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn EntityStore>, policy: PrescriptionPolicy) -> Self {
        Self { store, policy }
    }

    /// Writes a prescription for one of the caller's appointments.
    /// Doctor-only; needs at least one medicine with a name and a dosage.
    pub async fn create(
        &self,
        session: &SessionContext,
        draft: PrescriptionDraft,
    ) -> Result<Prescription, CoreError> {
        let doctor = session.require_doctor("create_prescription")?;
        validate_medicines(&draft.medicines)?;

        let appointment: Appointment =
            store::fetch_one(self.store.as_ref(), store::APPOINTMENTS, &draft.appointment_id)
                .await
                .map_err(|e| CoreError::from_store("Appointment", e))?;
        if appointment.doctor_id != doctor.id {
            return Err(CoreError::Forbidden {
                action: "create_prescription",
                role: "owning doctor",
            });
        }
        if appointment.status != AppointmentStatus::Completed {
            match self.policy {
                PrescriptionPolicy::WarnOnly => warn!(
                    appointment = %appointment.id,
                    status = appointment.status.as_str(),
                    "prescribing against an appointment that is not completed"
                ),
                PrescriptionPolicy::RequireCompleted => {
                    return Err(CoreError::Validation(format!(
                        "prescriptions need a completed appointment, this one is {}",
                        appointment.status.as_str()
                    )))
                }
            }
        }

        let medicines: Vec<Medicine> = draft
            .medicines
            .into_iter()
            .map(MedicineEntry::into_medicine)
            .collect();
        let prescription = Prescription {
            id: String::new(),
            appointment_id: draft.appointment_id,
            patient_id: appointment.patient_id,
            patient_name: appointment.patient_name,
            doctor_id: appointment.doctor_id,
            doctor_name: appointment.doctor_name,
            medicines,
            notes: draft.notes,
            status: PrescriptionStatus::Active,
            prescribed_date: Utc::now().date_naive(),
            next_follow_up: draft.next_follow_up,
            created_at: Utc::now(),
        };

        let stored: Prescription =
            store::insert(self.store.as_ref(), store::PRESCRIPTIONS, &prescription)
                .await
                .map_err(|e| CoreError::from_store("Prescription", e))?;
        info!(
            prescription = %stored.id,
            appointment = %stored.appointment_id,
            medicines = stored.medicines.len(),
            "prescription created"
        );
        Ok(stored)
    }

    /// Replaces the medicines, notes and follow-up of an existing
    /// prescription. The linkage and audit fields stay as they were.
    pub async fn update(
        &self,
        session: &SessionContext,
        id: &str,
        draft: PrescriptionDraft,
    ) -> Result<Prescription, CoreError> {
        let doctor = session.require_doctor("update_prescription")?;
        validate_medicines(&draft.medicines)?;

        let current = self.get(id).await?;
        if current.doctor_id != doctor.id {
            return Err(CoreError::Forbidden {
                action: "update_prescription",
                role: "owning doctor",
            });
        }

        let replacement = Prescription {
            medicines: draft
                .medicines
                .into_iter()
                .map(MedicineEntry::into_medicine)
                .collect(),
            notes: draft.notes,
            next_follow_up: draft.next_follow_up,
            ..current
        };
        store::overwrite(self.store.as_ref(), store::PRESCRIPTIONS, id, &replacement)
            .await
            .map_err(|e| CoreError::from_store("Prescription", e))
    }

    /// Moves the prescription between active, completed and cancelled.
    pub async fn set_status(
        &self,
        session: &SessionContext,
        id: &str,
        status: PrescriptionStatus,
    ) -> Result<Prescription, CoreError> {
        let doctor = session.require_doctor("update_prescription")?;
        let current = self.get(id).await?;
        if current.doctor_id != doctor.id {
            return Err(CoreError::Forbidden {
                action: "update_prescription",
                role: "owning doctor",
            });
        }

        store::update(
            self.store.as_ref(),
            store::PRESCRIPTIONS,
            id,
            json!({ "status": status }),
        )
        .await
        .map_err(|e| CoreError::from_store("Prescription", e))
    }

    pub async fn delete(&self, session: &SessionContext, id: &str) -> Result<(), CoreError> {
        let doctor = session.require_doctor("delete_prescription")?;
        let current = self.get(id).await?;
        if current.doctor_id != doctor.id {
            return Err(CoreError::Forbidden {
                action: "delete_prescription",
                role: "owning doctor",
            });
        }
        self.store
            .delete(store::PRESCRIPTIONS, id)
            .await
            .map_err(|e| CoreError::from_store("Prescription", e))
    }

    pub async fn get(&self, id: &str) -> Result<Prescription, CoreError> {
        store::fetch_one(self.store.as_ref(), store::PRESCRIPTIONS, id)
            .await
            .map_err(|e| CoreError::from_store("Prescription", e))
    }

    pub async fn list_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Prescription>, CoreError> {
        self.list_where("patientId", patient_id).await
    }

    pub async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Prescription>, CoreError> {
        self.list_where("doctorId", doctor_id).await
    }

    async fn list_where(&self, field: &str, id: &str) -> Result<Vec<Prescription>, CoreError> {
        let query = ListQuery::new().eq(field, id);
        let mut items: Vec<Prescription> =
            store::fetch_all(self.store.as_ref(), store::PRESCRIPTIONS, &query)
                .await
                .map_err(|e| CoreError::from_store("Prescription", e))?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}

fn validate_medicines(medicines: &[MedicineEntry]) -> Result<(), CoreError> {
    if medicines.is_empty() {
        return Err(CoreError::Validation(
            "a prescription needs at least one medicine".into(),
        ));
    }
    for medicine in medicines {
        if medicine.name.trim().is_empty() {
            return Err(CoreError::Validation(
                "every medicine needs a name".into(),
            ));
        }
        if medicine.dosage.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "medicine {} needs a dosage",
                medicine.name
            )));
        }
    }
    Ok(())
}
