//! Engine Configuration
//!
//! Everything the engine reads at startup. Loaded once by the host and
//! never re-read; changing it means building a new [`crate::FormTrap`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::decoy::DecoyConfig;
use crate::response::WebhookEndpoint;

// ============================================================================
// ERRORS
// ============================================================================

/// Startup configuration errors. Fatal; never raised per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("field name '{0}' is used more than once")]
    DuplicateFieldName(String),

    #[error("decoy name pool exhausted: {requested} unnamed decoys, {available} names left")]
    NamePoolExhausted { requested: usize, available: usize },

    #[error("invalid webhook url '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("invalid decoy definition: {0}")]
    InvalidDecoys(#[from] serde_json::Error),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

// ============================================================================
// TRAP CONFIG
// ============================================================================

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapConfig {
    /// Legacy honeypot field name (empty disables it)
    pub field_name: String,
    /// Redirect instead of 403 when a submission is denied
    pub redirect_on_trigger: bool,
    /// Redirect target for denied submissions
    pub redirect_to: String,
    /// Ban the client when a submission is denied
    pub ban_ip: bool,
    pub ban_duration_secs: u64,
    /// Decoy fields; unnamed ones get generated names
    pub decoys: Vec<DecoyConfig>,
    /// Alert endpoints
    pub webhooks: Vec<WebhookEndpoint>,
    pub webhook_timeout_secs: u64,
    /// At most one alert burst per client per window (seconds)
    pub notify_cooldown_secs: u64,
    /// Require the focus sentinel on submission
    pub require_field_interaction: bool,
    /// Minimum render-to-submit time (seconds)
    pub min_submit_secs: f64,
    /// Log submitted fields on trigger (operator channel)
    pub debug_log: bool,
    /// Serve the administrative surface
    pub enable_admin: bool,
    pub history_capacity: usize,
    pub marker_capacity: usize,
    pub marker_ttl_secs: u64,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            field_name: DEFAULT_FIELD_NAME.to_string(),
            redirect_on_trigger: false,
            redirect_to: "/".to_string(),
            ban_ip: false,
            ban_duration_secs: DEFAULT_BAN_DURATION_SECS,
            decoys: DecoyConfig::defaults(),
            webhooks: Vec::new(),
            webhook_timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
            notify_cooldown_secs: DEFAULT_NOTIFY_COOLDOWN_SECS,
            require_field_interaction: false,
            min_submit_secs: DEFAULT_MIN_SUBMIT_SECS,
            debug_log: false,
            enable_admin: false,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            marker_capacity: DEFAULT_MARKER_CAPACITY,
            marker_ttl_secs: DEFAULT_MARKER_TTL_SECS,
        }
    }
}

impl TrapConfig {
    /// Ban and notify aggressively (no redirect, interaction required)
    pub fn strict() -> Self {
        Self {
            ban_ip: true,
            require_field_interaction: true,
            ..Default::default()
        }
    }

    /// Reject values that cannot be represented at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        let spans = [
            ("ban_duration_secs", self.ban_duration_secs),
            ("notify_cooldown_secs", self.notify_cooldown_secs),
            ("webhook_timeout_secs", self.webhook_timeout_secs),
            ("marker_ttl_secs", self.marker_ttl_secs),
        ];
        for (key, secs) in spans {
            if secs > MAX_SPAN_SECS {
                return Err(ConfigError::InvalidValue { key: key.to_string(), value: secs.to_string() });
            }
        }

        if !self.min_submit_secs.is_finite() || self.min_submit_secs < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "min_submit_secs".to_string(),
                value: self.min_submit_secs.to_string(),
            });
        }
        Ok(())
    }

    /// Parse a JSON array of decoy definitions
    pub fn parse_decoys(json: &str) -> Result<Vec<DecoyConfig>, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
