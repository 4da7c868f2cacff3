//! Response Module - Mitigation after a trigger
//!
//! # Components
//! - `ban.rs`: Time-limited client bans
//! - `webhook.rs`: Alert delivery (Discord, Slack, generic JSON)
//! - `types.rs`: Shared types

pub mod ban;
pub mod types;
pub mod webhook;

pub use ban::BanStore;
pub use types::{
    ActiveBan, DeliveryError, DeliveryReport, DispatcherStats, NotifyOutcome, TriggerAlert,
    WebhookEndpoint, WebhookPlatform,
};
pub use webhook::{format_payload, NotificationDispatcher};
