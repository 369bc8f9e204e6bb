//! Patient reviews and per-doctor rating aggregation.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::error::CoreError;
use crate::models::{Appointment, AppointmentStatus, RatingStats, Review};
use crate::session::SessionContext;
use crate::store::{self, EntityStore, ListQuery};

pub struct ReviewService {
    store: Arc<dyn EntityStore>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Submits a review for one of the caller's completed appointments.
    /// One review per appointment; rating is whole stars 1 through 5.
    pub async fn submit(
        &self,
        session: &SessionContext,
        appointment_id: &str,
        rating: u8,
        text: &str,
    ) -> Result<Review, CoreError> {
        let patient = session.require_patient("submit_review")?;
        validate_rating(rating)?;
        validate_text(text)?;

        let appointment: Appointment =
            store::fetch_one(self.store.as_ref(), store::APPOINTMENTS, appointment_id)
                .await
                .map_err(|e| CoreError::from_store("Appointment", e))?;
        if appointment.patient_id != patient.id {
            return Err(CoreError::Forbidden {
                action: "submit_review",
                role: "owning patient",
            });
        }
        if appointment.status != AppointmentStatus::Completed {
            return Err(CoreError::Validation(format!(
                "only completed appointments can be reviewed, this one is {}",
                appointment.status.as_str()
            )));
        }

        let existing = self
            .store
            .list(
                store::REVIEWS,
                &ListQuery::new()
                    .eq("appointmentId", appointment_id)
                    .eq("patientId", &patient.id),
            )
            .await
            .map_err(|e| CoreError::from_store("Review", e))?;
        if !existing.is_empty() {
            return Err(CoreError::Validation(
                "this appointment has already been reviewed".into(),
            ));
        }

        let now = Utc::now();
        let draft = Review {
            id: String::new(),
            appointment_id: appointment_id.to_string(),
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            doctor_id: appointment.doctor_id,
            doctor_name: appointment.doctor_name,
            rating,
            review: text.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        let stored: Review = store::insert(self.store.as_ref(), store::REVIEWS, &draft)
            .await
            .map_err(|e| CoreError::from_store("Review", e))?;

        info!(
            review = %stored.id,
            doctor = %stored.doctor_id,
            rating = stored.rating,
            "review submitted"
        );
        Ok(stored)
    }

    /// Edits the caller's own review, bumping `updatedAt`. The rating and
    /// text rules match [`submit`](Self::submit).
    pub async fn update(
        &self,
        session: &SessionContext,
        review_id: &str,
        rating: u8,
        text: &str,
    ) -> Result<Review, CoreError> {
        let patient = session.require_patient("update_review")?;
        validate_rating(rating)?;
        validate_text(text)?;

        let current: Review = store::fetch_one(self.store.as_ref(), store::REVIEWS, review_id)
            .await
            .map_err(|e| CoreError::from_store("Review", e))?;
        if current.patient_id != patient.id {
            return Err(CoreError::Forbidden {
                action: "update_review",
                role: "owning patient",
            });
        }

        store::update(
            self.store.as_ref(),
            store::REVIEWS,
            review_id,
            json!({
                "rating": rating,
                "review": text.trim(),
                "updatedAt": Utc::now(),
            }),
        )
        .await
        .map_err(|e| CoreError::from_store("Review", e))
    }

    /// Every review written for the doctor, newest first.
    pub async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Review>, CoreError> {
        let query = ListQuery::new().eq("doctorId", doctor_id);
        let mut reviews: Vec<Review> =
            store::fetch_all(self.store.as_ref(), store::REVIEWS, &query)
                .await
                .map_err(|e| CoreError::from_store("Review", e))?;
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    /// Aggregates the doctor's ratings. A doctor with no reviews gets the
    /// explicit empty sentinel, never a fabricated zero average.
    pub async fn stats(&self, doctor_id: &str) -> Result<RatingStats, CoreError> {
        let reviews = self.list_for_doctor(doctor_id).await?;
        let ratings: Vec<u8> = reviews.iter().map(|r| r.rating).collect();
        Ok(RatingStats::from_ratings(&ratings))
    }
}

fn validate_rating(rating: u8) -> Result<(), CoreError> {
    if (1..=5).contains(&rating) {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "rating must be between 1 and 5, got {rating}"
    )))
}

fn validate_text(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation("review text must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::appointments::AppointmentService;
    use crate::models::{BookingRequest, SlotTime};
    use crate::store::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, ReviewService, AppointmentService) {
        let mem = Arc::new(MemoryStore::new());
        let reviews = ReviewService::new(mem.clone());
        let appointments = AppointmentService::new(mem.clone());
        (mem, reviews, appointments)
    }

    fn patient(n: u32) -> SessionContext {
        SessionContext::patient(
            &format!("pat-{n}"),
            &format!("Patient {n}"),
            &format!("patient{n}@example.com"),
        )
    }

    fn doctor() -> SessionContext {
        SessionContext::doctor("doc-1", "Dr. Meera Shah", "meera@clinic.example")
    }

    fn slot(hour: u32, minute: u32) -> SlotTime {
        SlotTime::new(hour, minute).unwrap()
    }

    fn request(time: SlotTime) -> BookingRequest {
        BookingRequest {
            patient_id: String::new(),
            patient_name: String::new(),
            doctor_id: "doc-1".into(),
            doctor_name: "Dr. Meera Shah".into(),
            specialty: "Cardiology".into(),
            date: Utc::now().date_naive() + Duration::days(1),
            time,
            appointment_type: "consultation".into(),
            notes: String::new(),
        }
    }

    async fn completed_appointment(
        appointments: &AppointmentService,
        who: &SessionContext,
        time: SlotTime,
    ) -> String {
        let booked = appointments.book(who, request(time)).await.unwrap();
        appointments
            .complete(&doctor(), &booked.id)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn reviews_need_a_completed_appointment() {
        let (_, reviews, appointments) = setup();
        let session = patient(1);

        let booked = appointments
            .book(&session, request(slot(10, 0)))
            .await
            .unwrap();
        let err = reviews
            .submit(&session, &booked.id, 5, "great care")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        appointments.complete(&doctor(), &booked.id).await.unwrap();
        let stored = reviews
            .submit(&session, &booked.id, 5, "great care")
            .await
            .unwrap();
        assert_eq!(stored.doctor_id, "doc-1");
        assert_eq!(stored.doctor_name, "Dr. Meera Shah");
        assert_eq!(stored.patient_name, "Patient 1");
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[tokio::test]
    async fn one_review_per_appointment() {
        let (_, reviews, appointments) = setup();
        let session = patient(1);
        let id = completed_appointment(&appointments, &session, slot(10, 0)).await;

        reviews.submit(&session, &id, 4, "helpful").await.unwrap();
        let err = reviews
            .submit(&session, &id, 5, "changed my mind")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn rating_range_and_text_are_validated() {
        let (_, reviews, appointments) = setup();
        let session = patient(1);
        let id = completed_appointment(&appointments, &session, slot(10, 0)).await;

        for bad in [0u8, 6] {
            let err = reviews
                .submit(&session, &id, bad, "fine")
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }
        let err = reviews.submit(&session, &id, 4, "   ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // Nothing was written by the rejected attempts.
        assert!(reviews.list_for_doctor("doc-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_appointment_owner_may_review() {
        let (_, reviews, appointments) = setup();
        let owner = patient(1);
        let id = completed_appointment(&appointments, &owner, slot(10, 0)).await;

        let err = reviews
            .submit(&patient(2), &id, 5, "not mine")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Forbidden {
                role: "owning patient",
                ..
            }
        ));

        let err = reviews
            .submit(&doctor(), &id, 5, "self praise")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { role: "patient", .. }));
    }

    #[tokio::test]
    async fn update_edits_in_place_and_bumps_updated_at() {
        let (_, reviews, appointments) = setup();
        let session = patient(1);
        let id = completed_appointment(&appointments, &session, slot(10, 0)).await;

        let stored = reviews.submit(&session, &id, 3, "it was ok").await.unwrap();
        let edited = reviews
            .update(&session, &stored.id, 5, "grew on me")
            .await
            .unwrap();

        assert_eq!(edited.id, stored.id);
        assert_eq!(edited.rating, 5);
        assert_eq!(edited.review, "grew on me");
        assert!(edited.updated_at > stored.updated_at);
        assert_eq!(edited.created_at, stored.created_at);

        let err = reviews
            .update(&session, &stored.id, 9, "too many stars")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = reviews
            .update(&patient(2), &stored.id, 1, "sabotage")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Forbidden {
                role: "owning patient",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn stats_aggregate_the_doctors_reviews() {
        let (_, reviews, appointments) = setup();

        let slots = [slot(9, 0), slot(10, 0), slot(11, 0)];
        for (n, (time, rating)) in slots.iter().zip([5u8, 4, 5]).enumerate() {
            let session = patient(n as u32 + 1);
            let id = completed_appointment(&appointments, &session, *time).await;
            reviews
                .submit(&session, &id, rating, "noted")
                .await
                .unwrap();
        }

        let stats = reviews.stats("doc-1").await.unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.average, Some(4.7));
        assert_eq!(stats.bucket(5).unwrap().count, 2);
        assert_eq!(stats.bucket(5).unwrap().percent, 67);
        assert_eq!(stats.bucket(4).unwrap().count, 1);
        assert_eq!(stats.bucket(4).unwrap().percent, 33);

        let listing = reviews.list_for_doctor("doc-1").await.unwrap();
        assert_eq!(listing.len(), 3);
    }

    #[tokio::test]
    async fn a_doctor_without_reviews_gets_the_empty_sentinel() {
        let (_, reviews, _) = setup();
        let stats = reviews.stats("doc-unrated").await.unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average, None);
        assert!(stats.distribution.iter().all(|b| b.count == 0 && b.percent == 0));
    }

    #[tokio::test]
    async fn unknown_ids_surface_as_not_found() {
        let (_, reviews, _) = setup();
        let session = patient(1);

        assert!(matches!(
            reviews.submit(&session, "missing-apt", 5, "text").await,
            Err(CoreError::NotFound { entity: "Appointment", .. })
        ));
        assert!(matches!(
            reviews.update(&session, "missing-review", 5, "text").await,
            Err(CoreError::NotFound { entity: "Review", .. })
        ));
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
