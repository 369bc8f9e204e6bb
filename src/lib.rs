//! MediBook appointment core: booking lifecycle, notification fan-out,
//! reviews and prescriptions over a REST document store.

pub mod config;
pub mod error;
pub mod session;
pub mod models;
pub mod store;
pub mod appointments;
pub mod notifications;
pub mod prescriptions;
pub mod reviews;

pub use appointments::AppointmentService;
pub use error::CoreError;
pub use notifications::{AppointmentEvent, NotificationService};
pub use prescriptions::{PrescriptionPolicy, PrescriptionService};
pub use reviews::ReviewService;
pub use session::{Identity, SessionContext};
pub use store::{EntityStore, MemoryStore, RestStore};

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. `RUST_LOG` wins when set,
/// otherwise the filter from [`config::default_log_filter`] applies.
/// Hosts call this once at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
