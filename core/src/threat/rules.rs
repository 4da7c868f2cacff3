//! Classification Rules
//!
//! Tunables for the heuristic pipeline. No logic lives here.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::span_secs;
use crate::config::TrapConfig;
use crate::constants::{DEFAULT_BAN_DURATION_SECS, DEFAULT_MIN_SUBMIT_SECS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRules {
    /// Below this render-to-submit time the client is a bot (seconds)
    pub min_submit_secs: f64,
    /// Deny submissions that never focused a control
    pub require_interaction: bool,
    /// Ban the client on every deny
    pub ban_on_trigger: bool,
    pub ban_duration_secs: u64,
    /// Log submitted fields on deny
    pub debug_log: bool,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            min_submit_secs: DEFAULT_MIN_SUBMIT_SECS,
            require_interaction: false,
            ban_on_trigger: false,
            ban_duration_secs: DEFAULT_BAN_DURATION_SECS,
            debug_log: false,
        }
    }
}

impl ClassificationRules {
    pub fn from_config(config: &TrapConfig) -> Self {
        Self {
            min_submit_secs: config.min_submit_secs,
            require_interaction: config.require_field_interaction,
            ban_on_trigger: config.ban_ip,
            ban_duration_secs: config.ban_duration_secs,
            debug_log: config.debug_log,
        }
    }

    pub fn ban_duration(&self) -> Duration {
        span_secs(self.ban_duration_secs)
    }
}
