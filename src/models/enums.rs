use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Wire values are the snake_case strings, both in JSON and via as_str.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(CoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
    Rescheduled => "rescheduled",
});

str_enum!(NotificationKind {
    AppointmentBooked => "appointment_booked",
    AppointmentConfirmed => "appointment_confirmed",
    AppointmentCancelled => "appointment_cancelled",
    AppointmentRescheduled => "appointment_rescheduled",
    NewAppointment => "new_appointment",
    PatientReminder => "patient_reminder",
    SystemUpdate => "system_update",
    Emergency => "emergency",
});

str_enum!(PrescriptionStatus {
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl AppointmentStatus {
    /// Statuses a transition may move to. Completed, cancelled and
    /// rescheduled accept no further status edits.
    pub fn valid_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled, Self::Rescheduled],
            Self::Confirmed => &[Self::Completed, Self::Cancelled, Self::Rescheduled],
            Self::Completed | Self::Cancelled | Self::Rescheduled => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    pub fn can_become(&self, next: AppointmentStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Rescheduling is a date/time mutation, not a status edit: an already
    /// rescheduled appointment may move again without leaving its status.
    pub fn allows_reschedule(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Rescheduled)
    }
}
