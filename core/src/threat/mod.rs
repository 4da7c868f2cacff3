//! Threat Module
//!
//! Decides whether a submission came from a human.
//!
//! ## Structure
//! - `types`: Verdict
//! - `rules`: tunables
//! - `classifier`: heuristic pipeline and trigger side effects

pub mod classifier;
pub mod rules;
pub mod types;

pub use classifier::{evaluate, Classifier};
pub use rules::ClassificationRules;
pub use types::Verdict;
