//! Domain error taxonomy shared by every service.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::SlotTime;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before any write was attempted.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Another non-cancelled appointment already holds the slot.
    #[error("Doctor {doctor_id} already has an appointment on {date} at {time}")]
    SlotTaken {
        doctor_id: String,
        date: NaiveDate,
        time: SlotTime,
    },

    /// The document changed since the caller last read it.
    #[error("Stale write: expected version {expected}, found {actual}")]
    StaleWrite { expected: i64, actual: i64 },

    #[error("{action} requires the {role} role")]
    Forbidden {
        action: &'static str,
        role: &'static str,
    },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Store misses become domain not-found errors; everything else stays a
    /// store failure.
    pub(crate) fn from_store(entity: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Missing { id, .. } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}
