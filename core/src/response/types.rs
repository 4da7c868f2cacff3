//! Response Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::ConfigError;
use crate::form::ClientId;

// ============================================================================
// BAN TYPES
// ============================================================================

/// Active ban as shown to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveBan {
    pub client_id: ClientId,
    pub expires_at: DateTime<Utc>,
    /// Whole seconds left, rounded up
    pub remaining_secs: u64,
}

// ============================================================================
// WEBHOOK TYPES
// ============================================================================

/// Payload format expected by the receiving endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookPlatform {
    Discord,
    Slack,
    Generic,
}

impl WebhookPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookPlatform::Discord => "discord",
            WebhookPlatform::Slack => "slack",
            WebhookPlatform::Generic => "generic",
        }
    }

    /// Guess the platform from the endpoint host
    pub fn detect(url: &Url) -> Self {
        match url.host_str() {
            Some(host) if host == "discord.com" || host.ends_with(".discord.com")
                || host == "discordapp.com" || host.ends_with(".discordapp.com") =>
            {
                WebhookPlatform::Discord
            }
            Some("hooks.slack.com") => WebhookPlatform::Slack,
            _ => WebhookPlatform::Generic,
        }
    }
}

/// Alert endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub url: String,
    pub platform: WebhookPlatform,
}

impl WebhookEndpoint {
    /// Parse an http(s) URL and detect its platform
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let url = validate_url(raw)?;
        Ok(Self {
            platform: WebhookPlatform::detect(&url),
            url: url.to_string(),
        })
    }

    pub fn with_platform(raw: &str, platform: WebhookPlatform) -> Result<Self, ConfigError> {
        let url = validate_url(raw)?;
        Ok(Self { url: url.to_string(), platform })
    }
}

pub(crate) fn validate_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidWebhookUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

/// What an alert says about one trigger
#[derive(Debug, Clone, Serialize)]
pub struct TriggerAlert {
    pub client_id: ClientId,
    pub path: String,
    pub reason: String,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// DELIVERY RESULTS
// ============================================================================

/// Failure delivering to one endpoint. Logged and discarded by the
/// dispatcher; never reaches the request path.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(u16),
}

/// Per-burst delivery summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Result of asking the dispatcher to notify
#[derive(Debug)]
pub enum NotifyOutcome {
    /// Burst claimed; delivery running in the background
    Dispatched(JoinHandle<DeliveryReport>),
    /// Client still inside its cool-down window
    Suppressed,
    /// Burst claimed but no endpoints are configured
    NoEndpoints,
    /// Burst claimed but no async runtime to deliver on
    NoRuntime,
}

impl NotifyOutcome {
    /// True when this call counted as a notification attempt
    pub fn is_attempt(&self) -> bool {
        !matches!(self, NotifyOutcome::Suppressed)
    }
}

/// Dispatcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub attempts: u64,
    pub suppressed: u64,
    pub delivered: u64,
    pub failed: u64,
    pub tracked_clients: usize,
}
