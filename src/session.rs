//! Caller identity. Every mutating operation takes a `SessionContext`; the
//! core trusts it as-is and never re-derives who is signed in.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Minimal identity record handed in by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: &str, name: &str, email: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// The signed-in caller: a role plus identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionContext {
    Patient(Identity),
    Doctor(Identity),
}

impl SessionContext {
    pub fn patient(id: &str, name: &str, email: &str) -> Self {
        Self::Patient(Identity::new(id, name, email))
    }

    pub fn doctor(id: &str, name: &str, email: &str) -> Self {
        Self::Doctor(Identity::new(id, name, email))
    }

    pub fn identity(&self) -> &Identity {
        match self {
            Self::Patient(who) | Self::Doctor(who) => who,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::Patient(_) => "patient",
            Self::Doctor(_) => "doctor",
        }
    }

    pub fn is_doctor(&self) -> bool {
        matches!(self, Self::Doctor(_))
    }

    pub fn as_patient(&self) -> Option<&Identity> {
        match self {
            Self::Patient(who) => Some(who),
            Self::Doctor(_) => None,
        }
    }

    pub fn as_doctor(&self) -> Option<&Identity> {
        match self {
            Self::Doctor(who) => Some(who),
            Self::Patient(_) => None,
        }
    }

    pub(crate) fn require_patient(&self, action: &'static str) -> Result<&Identity, CoreError> {
        self.as_patient().ok_or(CoreError::Forbidden {
            action,
            role: "patient",
        })
    }

    pub(crate) fn require_doctor(&self, action: &'static str) -> Result<&Identity, CoreError> {
        self.as_doctor().ok_or(CoreError::Forbidden {
            action,
            role: "doctor",
        })
    }
}
