//! Wire documents shared with the document store.

pub mod appointment;
pub mod enums;
pub mod notification;
pub mod prescription;
pub mod review;
pub mod slot;

pub use appointment::{Appointment, BookingRequest};
pub use enums::{AppointmentStatus, NotificationKind, PrescriptionStatus};
pub use notification::{NewNotification, Notification, NotificationTarget};
pub use prescription::{Medicine, MedicineEntry, Prescription, PrescriptionDraft};
pub use review::{RatingBucket, RatingStats, Review};
pub use slot::SlotTime;
