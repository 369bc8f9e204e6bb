//! Appointment lifecycle: booking, confirmation, completion, cancellation
//! and rescheduling.
//!
//! Every mutation re-reads the document, checks the transition against the
//! status machine in `models::enums`, optionally compares a caller-supplied
//! version, and only then writes. Failed checks leave the store untouched.
//! Notification fan-out runs strictly after the primary write has committed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde_json::json;
use tracing::info;

use crate::config::{self, BookingWindow};
use crate::error::CoreError;
use crate::models::{Appointment, AppointmentStatus, BookingRequest, SlotTime};
use crate::notifications::{AppointmentEvent, NotificationService};
use crate::session::SessionContext;
use crate::store::{self, EntityStore, ListQuery};

pub struct AppointmentService {
    store: Arc<dyn EntityStore>,
    notifier: NotificationService,
    window: BookingWindow,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self::with_window(store, BookingWindow::default())
    }

    /// Same service with a different advance-booking range. Doctor desks
    /// book walk-ins through [`BookingWindow::doctor_flow`].
    pub fn with_window(store: Arc<dyn EntityStore>, window: BookingWindow) -> Self {
        Self {
            notifier: NotificationService::new(store.clone()),
            store,
            window,
        }
    }

    // ─── Booking ──────────────────────────────────────────────────────────

    /// Books an appointment. Patient sessions book for themselves and the
    /// appointment starts `confirmed`; doctor sessions book on a patient's
    /// behalf and it starts `pending` until the doctor confirms it.
    pub async fn book(
        &self,
        session: &SessionContext,
        request: BookingRequest,
    ) -> Result<Appointment, CoreError> {
        let (patient_id, patient_name, status) = match session {
            SessionContext::Patient(who) => (
                who.id.clone(),
                who.name.clone(),
                AppointmentStatus::Confirmed,
            ),
            SessionContext::Doctor(who) => {
                if who.id != request.doctor_id {
                    return Err(CoreError::Forbidden {
                        action: "book_appointment",
                        role: "owning doctor",
                    });
                }
                if request.patient_id.trim().is_empty() || request.patient_name.trim().is_empty()
                {
                    return Err(CoreError::Validation(
                        "doctor bookings need the patient's id and name".into(),
                    ));
                }
                (
                    request.patient_id.clone(),
                    request.patient_name.clone(),
                    AppointmentStatus::Pending,
                )
            }
        };

        self.validate_booking(&request)?;

        let day = self
            .doctor_day_load(&request.doctor_id, request.date)
            .await?;
        ensure_slot_free(&day, &request.doctor_id, request.date, request.time, None)?;
        let token_number = generate_token(&mut rand::thread_rng(), &day);

        let draft = Appointment {
            id: String::new(),
            token_number,
            patient_id,
            patient_name,
            doctor_id: request.doctor_id,
            doctor_name: request.doctor_name,
            specialty: request.specialty,
            date: request.date,
            time: request.time,
            appointment_type: request.appointment_type,
            notes: request.notes,
            status,
            original_date: None,
            original_time: None,
            rescheduled_at: None,
            version: 1,
            created_at: Utc::now(),
        };

        let stored: Appointment = store::insert(self.store.as_ref(), store::APPOINTMENTS, &draft)
            .await
            .map_err(|e| CoreError::from_store("Appointment", e))?;

        info!(
            appointment = %stored.id,
            doctor = %stored.doctor_id,
            status = stored.status.as_str(),
            token = %stored.token_number,
            "appointment booked"
        );
        self.notifier
            .fan_out(AppointmentEvent::Booked, &stored, session)
            .await;
        Ok(stored)
    }

    // ─── Reads ────────────────────────────────────────────────────────────

    pub async fn get(&self, id: &str) -> Result<Appointment, CoreError> {
        store::fetch_one(self.store.as_ref(), store::APPOINTMENTS, id)
            .await
            .map_err(|e| CoreError::from_store("Appointment", e))
    }

    pub async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, CoreError> {
        self.list_where("patientId", patient_id).await
    }

    pub async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>, CoreError> {
        self.list_where("doctorId", doctor_id).await
    }

    async fn list_where(&self, field: &str, id: &str) -> Result<Vec<Appointment>, CoreError> {
        let query = ListQuery::new().eq(field, id);
        let mut items: Vec<Appointment> =
            store::fetch_all(self.store.as_ref(), store::APPOINTMENTS, &query)
                .await
                .map_err(|e| CoreError::from_store("Appointment", e))?;
        items.sort_by_key(|a| (a.date, a.time));
        Ok(items)
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────

    /// Moves a pending appointment to confirmed. Doctor-only. Confirming an
    /// already-confirmed appointment returns it unchanged.
    pub async fn confirm(
        &self,
        session: &SessionContext,
        id: &str,
    ) -> Result<Appointment, CoreError> {
        let current = self.get(id).await?;
        require_owning_doctor(session, &current, "confirm_appointment")?;

        if current.status == AppointmentStatus::Confirmed {
            return Ok(current);
        }
        ensure_transition(&current, AppointmentStatus::Confirmed)?;

        let updated = self
            .write_status(&current, AppointmentStatus::Confirmed)
            .await?;
        self.notifier
            .fan_out(AppointmentEvent::Confirmed, &updated, session)
            .await;
        Ok(updated)
    }

    /// Marks a confirmed appointment completed, which unlocks reviews and
    /// prescriptions. Doctor-only, idempotent on completed, no notification.
    pub async fn complete(
        &self,
        session: &SessionContext,
        id: &str,
    ) -> Result<Appointment, CoreError> {
        let current = self.get(id).await?;
        require_owning_doctor(session, &current, "complete_appointment")?;

        if current.status == AppointmentStatus::Completed {
            return Ok(current);
        }
        ensure_transition(&current, AppointmentStatus::Completed)?;
        self.write_status(&current, AppointmentStatus::Completed)
            .await
    }

    /// Cancels from pending or confirmed. Either party may cancel their own
    /// appointment. Cancelling twice is a no-op that sends no second
    /// notification; pass `expected_version` to reject writes based on a
    /// stale read.
    pub async fn cancel(
        &self,
        session: &SessionContext,
        id: &str,
        expected_version: Option<i64>,
    ) -> Result<Appointment, CoreError> {
        let current = self.get(id).await?;
        check_party(session, &current)?;

        if current.status == AppointmentStatus::Cancelled {
            return Ok(current);
        }
        ensure_transition(&current, AppointmentStatus::Cancelled)?;
        check_version(&current, expected_version)?;

        let updated = self
            .write_status(&current, AppointmentStatus::Cancelled)
            .await?;
        self.notifier
            .fan_out(AppointmentEvent::Cancelled, &updated, session)
            .await;
        Ok(updated)
    }

    /// Moves the appointment to a new slot. Doctor-only. Works from pending,
    /// confirmed or rescheduled; the status lands on `rescheduled` and stays
    /// there through repeat moves. `originalDate`/`originalTime` hold the
    /// slot the appointment sat in just before this move.
    pub async fn reschedule(
        &self,
        session: &SessionContext,
        id: &str,
        new_date: NaiveDate,
        new_time: SlotTime,
        expected_version: Option<i64>,
    ) -> Result<Appointment, CoreError> {
        let current = self.get(id).await?;
        require_owning_doctor(session, &current, "reschedule_appointment")?;

        if !current.status.allows_reschedule() {
            return Err(CoreError::Validation(format!(
                "a {} appointment cannot be rescheduled",
                current.status.as_str()
            )));
        }
        check_version(&current, expected_version)?;
        ensure_listed_slot(new_time)?;
        self.ensure_in_window(new_date)?;

        let day = self.doctor_day_load(&current.doctor_id, new_date).await?;
        ensure_slot_free(
            &day,
            &current.doctor_id,
            new_date,
            new_time,
            Some(&current.id),
        )?;

        let now = Utc::now();
        // The audit stamp never regresses, even if the clock stepped back.
        let stamp = match current.rescheduled_at {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        let updated: Appointment = store::update(
            self.store.as_ref(),
            store::APPOINTMENTS,
            &current.id,
            json!({
                "status": AppointmentStatus::Rescheduled,
                "date": new_date,
                "time": new_time,
                "originalDate": current.date,
                "originalTime": current.time,
                "rescheduledAt": stamp,
                "version": current.version + 1,
            }),
        )
        .await
        .map_err(|e| CoreError::from_store("Appointment", e))?;

        info!(
            appointment = %updated.id,
            date = %updated.date,
            time = %updated.time,
            "appointment rescheduled"
        );
        self.notifier
            .fan_out(AppointmentEvent::Rescheduled, &updated, session)
            .await;
        Ok(updated)
    }

    // ─── Internals ────────────────────────────────────────────────────────

    fn validate_booking(&self, request: &BookingRequest) -> Result<(), CoreError> {
        if request.doctor_id.trim().is_empty() {
            return Err(CoreError::Validation("doctorId must not be empty".into()));
        }
        if request.doctor_name.trim().is_empty() {
            return Err(CoreError::Validation("doctorName must not be empty".into()));
        }
        ensure_listed_slot(request.time)?;
        self.ensure_in_window(request.date)
    }

    fn ensure_in_window(&self, date: NaiveDate) -> Result<(), CoreError> {
        let today = Utc::now().date_naive();
        if self.window.contains(date, today) {
            return Ok(());
        }
        Err(CoreError::Validation(format!(
            "date {} is outside the booking window of {} to {} days ahead",
            date, self.window.min_days_ahead, self.window.max_days_ahead
        )))
    }

    /// Everything on the doctor's plate for one date, cancelled included.
    async fn doctor_day_load(
        &self,
        doctor_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, CoreError> {
        let query = ListQuery::new().eq("doctorId", doctor_id).eq("date", date);
        store::fetch_all(self.store.as_ref(), store::APPOINTMENTS, &query)
            .await
            .map_err(|e| CoreError::from_store("Appointment", e))
    }

    async fn write_status(
        &self,
        current: &Appointment,
        next: AppointmentStatus,
    ) -> Result<Appointment, CoreError> {
        let updated = store::update(
            self.store.as_ref(),
            store::APPOINTMENTS,
            &current.id,
            json!({ "status": next, "version": current.version + 1 }),
        )
        .await
        .map_err(|e| CoreError::from_store("Appointment", e))?;
        info!(
            appointment = %current.id,
            from = current.status.as_str(),
            to = next.as_str(),
            "appointment status changed"
        );
        Ok(updated)
    }
}

fn check_party(session: &SessionContext, appointment: &Appointment) -> Result<(), CoreError> {
    match session {
        SessionContext::Patient(who) if who.id == appointment.patient_id => Ok(()),
        SessionContext::Doctor(who) if who.id == appointment.doctor_id => Ok(()),
        SessionContext::Patient(_) => Err(CoreError::Forbidden {
            action: "cancel_appointment",
            role: "owning patient",
        }),
        SessionContext::Doctor(_) => Err(CoreError::Forbidden {
            action: "cancel_appointment",
            role: "owning doctor",
        }),
    }
}

fn require_owning_doctor(
    session: &SessionContext,
    appointment: &Appointment,
    action: &'static str,
) -> Result<(), CoreError> {
    let doctor = session.require_doctor(action)?;
    if doctor.id != appointment.doctor_id {
        return Err(CoreError::Forbidden {
            action,
            role: "owning doctor",
        });
    }
    Ok(())
}

fn ensure_transition(current: &Appointment, next: AppointmentStatus) -> Result<(), CoreError> {
    if current.status.can_become(next) {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "a {} appointment cannot become {}",
        current.status.as_str(),
        next.as_str()
    )))
}

fn check_version(current: &Appointment, expected: Option<i64>) -> Result<(), CoreError> {
    match expected {
        Some(expected) if expected != current.version => Err(CoreError::StaleWrite {
            expected,
            actual: current.version,
        }),
        _ => Ok(()),
    }
}

fn ensure_listed_slot(time: SlotTime) -> Result<(), CoreError> {
    let rendered = time.to_string();
    if config::SLOT_TIMES.iter().any(|s| *s == rendered) {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "{rendered} is not a bookable slot"
    )))
}

fn ensure_slot_free(
    day: &[Appointment],
    doctor_id: &str,
    date: NaiveDate,
    time: SlotTime,
    exclude: Option<&str>,
) -> Result<(), CoreError> {
    let clash = day.iter().any(|a| {
        a.status != AppointmentStatus::Cancelled
            && a.time == time
            && exclude.map_or(true, |id| a.id != id)
    });
    if clash {
        return Err(CoreError::SlotTaken {
            doctor_id: doctor_id.to_string(),
            date,
            time,
        });
    }
    Ok(())
}

/// Six random digits behind a `T`, re-rolled until unique among the
/// doctor's same-date non-cancelled tokens.
fn generate_token<R: Rng>(rng: &mut R, day: &[Appointment]) -> String {
    let taken: HashSet<&str> = day
        .iter()
        .filter(|a| a.status != AppointmentStatus::Cancelled)
        .map(|a| a.token_number.as_str())
        .collect();
    loop {
        let token = format!("T{:06}", rng.gen_range(0..1_000_000));
        if !taken.contains(token.as_str()) {
            return token;
        }
    }
}
