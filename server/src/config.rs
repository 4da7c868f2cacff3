//! Configuration module

use std::env;
use std::str::FromStr;

use formtrap_core::constants::*;
use formtrap_core::{ConfigError, TrapConfig, WebhookEndpoint};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Take the client address from X-Forwarded-For (only behind a proxy that overwrites it)
    pub trust_forwarded: bool,

    /// Engine configuration
    pub trap: TrapConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let decoys = match get("FORMTRAP_DECOYS") {
            Some(json) => TrapConfig::parse_decoys(&json)?,
            None => formtrap_core::DecoyConfig::defaults(),
        };

        let webhooks = get("FORMTRAP_WEBHOOK_URLS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(WebhookEndpoint::parse)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let trap = TrapConfig {
            field_name: get("FORMTRAP_FIELD_NAME").unwrap_or_else(|| DEFAULT_FIELD_NAME.to_string()),
            redirect_on_trigger: parse_bool(&get, "FORMTRAP_REDIRECT_ON_TRIGGER", false)?,
            redirect_to: get("FORMTRAP_REDIRECT_TO").unwrap_or_else(|| "/".to_string()),
            ban_ip: parse_bool(&get, "FORMTRAP_BAN_IP", false)?,
            ban_duration_secs: parse_num(&get, "FORMTRAP_BAN_DURATION_SECS", DEFAULT_BAN_DURATION_SECS)?,
            decoys,
            webhooks,
            webhook_timeout_secs: parse_num(
                &get,
                "FORMTRAP_WEBHOOK_TIMEOUT_SECS",
                DEFAULT_WEBHOOK_TIMEOUT_SECS,
            )?,
            notify_cooldown_secs: parse_num(
                &get,
                "FORMTRAP_NOTIFY_COOLDOWN_SECS",
                DEFAULT_NOTIFY_COOLDOWN_SECS,
            )?,
            require_field_interaction: parse_bool(&get, "FORMTRAP_REQUIRE_INTERACTION", false)?,
            debug_log: parse_bool(&get, "FORMTRAP_DEBUG_LOG", false)?,
            enable_admin: parse_bool(&get, "FORMTRAP_ENABLE_ADMIN", false)?,
            history_capacity: parse_num(&get, "FORMTRAP_HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY)?,
            ..TrapConfig::default()
        };

        Ok(Self {
            port: parse_num(&get, "PORT", 8080)?,
            trust_forwarded: parse_bool(&get, "FORMTRAP_TRUST_FORWARDED", false)?,
            trap,
        })
    }
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: raw }),
    }
}

fn parse_num<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: raw }),
        None => Ok(default),
    }
}
