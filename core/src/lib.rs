//! FormTrap Core - Honeypot engine for HTML form submissions
//!
//! ## Architecture
//! - `decoy/` - Hidden decoy fields and name assignment
//! - `marker` - Per-render submission markers
//! - `threat/` - Classification of submissions
//! - `response/` - Bans and webhook notifications
//! - `incident/` - Trigger history and CSV export
//! - `engine` - Facade wiring the components together

pub mod clock;
pub mod config;
pub mod constants;
pub mod decoy;
pub mod engine;
pub mod form;
pub mod incident;
pub mod marker;
pub mod response;
pub mod threat;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{ConfigError, TrapConfig};
pub use decoy::{DecoyConfig, DecoyKind, DecoyRegistry, DecoySpec};
pub use engine::{FormTrap, GateDecision, TrapStats, TriggerAction};
pub use form::{ClientId, FormFields, RequestContext};
pub use incident::{IncidentLog, IncidentReason, IncidentRecord};
pub use marker::{IssuedForm, MarkerIssuer, SubmissionMarker};
pub use response::{ActiveBan, BanStore, NotificationDispatcher, WebhookEndpoint, WebhookPlatform};
pub use threat::Verdict;
