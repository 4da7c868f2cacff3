//! Incident Types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::form::ClientId;

/// Why a submission was denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncidentReason {
    FastSubmit,
    NoInteraction,
    LegacyFieldFilled { field: String },
    DecoyFieldFilled { field: String },
}

impl IncidentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentReason::FastSubmit => "fast_submit",
            IncidentReason::NoInteraction => "no_interaction",
            IncidentReason::LegacyFieldFilled { .. } => "legacy_field_filled",
            IncidentReason::DecoyFieldFilled { .. } => "decoy_field_filled",
        }
    }

    /// Field that gave the client away, for field-based reasons
    pub fn field(&self) -> Option<&str> {
        match self {
            IncidentReason::LegacyFieldFilled { field } | IncidentReason::DecoyFieldFilled { field } => {
                Some(field)
            }
            _ => None,
        }
    }
}

impl fmt::Display for IncidentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentReason::FastSubmit => f.write_str("suspiciously fast submit"),
            IncidentReason::NoInteraction => f.write_str("no field focus"),
            IncidentReason::LegacyFieldFilled { field } => write!(f, "legacy field '{}' filled", field),
            IncidentReason::DecoyFieldFilled { field } => write!(f, "decoy field '{}' filled", field),
        }
    }
}

/// One trigger event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub timestamp: DateTime<Utc>,
    pub client_id: ClientId,
    pub path: String,
    pub reason: IncidentReason,
}

impl fmt::Display for IncidentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[HONEYPOT] Triggered by IP: {} | Path: {} | Reason: {}",
            self.client_id, self.path, self.reason
        )
    }
}
