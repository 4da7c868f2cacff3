//! Incident Module
//!
//! History of denied submissions.
//!
//! ## Structure
//! - `types`: IncidentReason, IncidentRecord
//! - `log`: bounded append-only log
//! - `export`: CSV export

pub mod export;
pub mod log;
pub mod types;

pub use export::{to_csv, write_csv, CSV_HEADER};
pub use log::{IncidentLog, IncidentStats};
pub use types::{IncidentReason, IncidentRecord};
