//! Notification fan-out and inbox operations.
//!
//! Lifecycle mutations call [`NotificationService::fan_out`] after the
//! primary write has committed. Delivery is best effort: each draft is
//! written independently and a failed write is logged and swallowed, so a
//! flaky notifications collection can never fail a booking or cancel.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::models::{
    Appointment, NewNotification, Notification, NotificationKind, NotificationTarget,
};
use crate::session::SessionContext;
use crate::store::{self, EntityStore, ListQuery};

/// Lifecycle event worth telling somebody about. Completion deliberately
/// has no variant: nothing in the product notifies on complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentEvent {
    Booked,
    Confirmed,
    Cancelled,
    Rescheduled,
}

pub struct NotificationService {
    store: Arc<dyn EntityStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    // ─── Fan-out ──────────────────────────────────────────────────────────

    /// Builds the notification drafts for an event. Pure so the routing
    /// rules can be checked without a store.
    ///
    /// The patient hears about every event on their appointment. The doctor
    /// additionally hears about bookings made on the patient's behalf from
    /// their own desk, and about cancellations the patient initiated.
    pub fn drafts_for(
        event: AppointmentEvent,
        appointment: &Appointment,
        actor: &SessionContext,
    ) -> Vec<NewNotification> {
        let mut drafts = Vec::with_capacity(2);
        match event {
            AppointmentEvent::Booked => {
                drafts.push(NewNotification::for_patient(
                    &appointment.patient_id,
                    NotificationKind::AppointmentBooked,
                    "Appointment Booked",
                    &format!(
                        "Your appointment with {} on {} at {} has been booked. Token number {}.",
                        appointment.doctor_name,
                        appointment.date,
                        appointment.time,
                        appointment.token_number
                    ),
                ));
                if actor.is_doctor() {
                    drafts.push(NewNotification::for_doctor(
                        &appointment.doctor_id,
                        NotificationKind::NewAppointment,
                        "New Appointment",
                        &format!(
                            "New appointment with {} on {} at {}. Token number {}.",
                            appointment.patient_name,
                            appointment.date,
                            appointment.time,
                            appointment.token_number
                        ),
                    ));
                }
            }
            AppointmentEvent::Confirmed => {
                drafts.push(NewNotification::for_patient(
                    &appointment.patient_id,
                    NotificationKind::AppointmentConfirmed,
                    "Appointment Confirmed",
                    &format!(
                        "Your appointment with {} on {} at {} has been confirmed.",
                        appointment.doctor_name, appointment.date, appointment.time
                    ),
                ));
            }
            AppointmentEvent::Cancelled => {
                drafts.push(NewNotification::for_patient(
                    &appointment.patient_id,
                    NotificationKind::AppointmentCancelled,
                    "Appointment Cancelled",
                    &format!(
                        "Your appointment with {} on {} at {} has been cancelled.",
                        appointment.doctor_name, appointment.date, appointment.time
                    ),
                ));
                if !actor.is_doctor() {
                    drafts.push(NewNotification::for_doctor(
                        &appointment.doctor_id,
                        NotificationKind::AppointmentCancelled,
                        "Appointment Cancelled",
                        &format!(
                            "{} cancelled their appointment on {} at {}.",
                            appointment.patient_name, appointment.date, appointment.time
                        ),
                    ));
                }
            }
            AppointmentEvent::Rescheduled => {
                drafts.push(NewNotification::for_patient(
                    &appointment.patient_id,
                    NotificationKind::AppointmentRescheduled,
                    "Appointment Rescheduled",
                    &format!(
                        "Your appointment with {} has been moved to {} at {}.",
                        appointment.doctor_name, appointment.date, appointment.time
                    ),
                ));
            }
        }
        drafts
    }

    /// Writes every draft for the event. Never fails: callers have already
    /// committed the appointment mutation this announces.
    pub async fn fan_out(
        &self,
        event: AppointmentEvent,
        appointment: &Appointment,
        actor: &SessionContext,
    ) {
        for draft in Self::drafts_for(event, appointment, actor) {
            match store::insert::<_, Notification>(
                self.store.as_ref(),
                store::NOTIFICATIONS,
                &draft,
            )
            .await
            {
                Ok(stored) => {
                    debug!(notification = %stored.id, kind = stored.kind.as_str(), "notification delivered");
                }
                Err(err) => {
                    warn!(
                        appointment = %appointment.id,
                        kind = draft.kind.as_str(),
                        error = %err,
                        "notification delivery failed, continuing"
                    );
                }
            }
        }
    }

    // ─── Inbox ────────────────────────────────────────────────────────────

    pub async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Notification>, CoreError> {
        self.list_for(NotificationTarget::Patient(patient_id)).await
    }

    pub async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Notification>, CoreError> {
        self.list_for(NotificationTarget::Doctor(doctor_id)).await
    }

    async fn list_for(
        &self,
        target: NotificationTarget<'_>,
    ) -> Result<Vec<Notification>, CoreError> {
        let query = ListQuery::new().eq(target.field(), target.id());
        let mut items: Vec<Notification> =
            store::fetch_all(self.store.as_ref(), store::NOTIFICATIONS, &query)
                .await
                .map_err(|e| CoreError::from_store("Notification", e))?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    pub async fn unread_count(&self, target: NotificationTarget<'_>) -> Result<usize, CoreError> {
        let query = ListQuery::new()
            .eq(target.field(), target.id())
            .eq("read", false);
        let docs = self
            .store
            .list(store::NOTIFICATIONS, &query)
            .await
            .map_err(|e| CoreError::from_store("Notification", e))?;
        Ok(docs.len())
    }

    /// Flips `read` on one notification. Re-issuing on an already-read
    /// notification returns it unchanged without another write.
    pub async fn mark_read(&self, id: &str) -> Result<Notification, CoreError> {
        let current: Notification = store::fetch_one(self.store.as_ref(), store::NOTIFICATIONS, id)
            .await
            .map_err(|e| CoreError::from_store("Notification", e))?;
        if current.read {
            return Ok(current);
        }
        store::update(
            self.store.as_ref(),
            store::NOTIFICATIONS,
            id,
            json!({ "read": true }),
        )
        .await
        .map_err(|e| CoreError::from_store("Notification", e))
    }

    /// Marks every unread notification for the target. Returns how many
    /// were flipped.
    pub async fn mark_all_read(&self, target: NotificationTarget<'_>) -> Result<usize, CoreError> {
        let query = ListQuery::new()
            .eq(target.field(), target.id())
            .eq("read", false);
        let unread: Vec<Notification> =
            store::fetch_all(self.store.as_ref(), store::NOTIFICATIONS, &query)
                .await
                .map_err(|e| CoreError::from_store("Notification", e))?;
        for item in &unread {
            store::update::<Notification>(
                self.store.as_ref(),
                store::NOTIFICATIONS,
                &item.id,
                json!({ "read": true }),
            )
            .await
            .map_err(|e| CoreError::from_store("Notification", e))?;
        }
        Ok(unread.len())
    }

    /// Deletes the notification. There is no undo.
    pub async fn dismiss(&self, id: &str) -> Result<(), CoreError> {
        self.store
            .delete(store::NOTIFICATIONS, id)
            .await
            .map_err(|e| CoreError::from_store("Notification", e))
    }
}
