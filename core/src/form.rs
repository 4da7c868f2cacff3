//! Submission Types
//!
//! Typed view of a submitted form and of the request that carried it.
//! Built once at the HTTP boundary; the engine only does key lookups.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

// ============================================================================
// CLIENT IDENTITY
// ============================================================================

/// Identifier of the submitting client (normally its IP address)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for 127.0.0.0/8 and ::1 (also IPv4-mapped loopback)
    pub fn is_loopback(&self) -> bool {
        match self.0.parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => v4.is_loopback(),
            Ok(IpAddr::V6(v6)) => {
                v6.is_loopback() || v6.to_ipv4_mapped().map_or(false, |v4| v4.is_loopback())
            }
            Err(_) => false,
        }
    }
}

impl From<IpAddr> for ClientId {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// FORM FIELDS
// ============================================================================

/// Submitted form fields keyed by name.
///
/// Repeated keys keep the first non-blank value so a filled decoy cannot be
/// masked by a trailing empty duplicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormFields {
    values: HashMap<String, String>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = Self::new();
        for (k, v) in pairs {
            fields.insert(k, v);
        }
        fields
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let slot = self.values.entry(name.into()).or_default();
        if slot.trim().is_empty() {
            *slot = value;
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Present and non-blank after trimming
    pub fn is_filled(&self, name: &str) -> bool {
        self.get(name).map_or(false, |v| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// REQUEST CONTEXT
// ============================================================================

/// What the engine needs to know about the request besides the form
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client_id: ClientId,
    pub path: String,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(client_id: impl Into<ClientId>, path: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            path: path.into(),
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_filled_trims_whitespace() {
        let fields = FormFields::from_pairs([("a", "  "), ("b", " x "), ("c", "")]);

        assert!(!fields.is_filled("a"));
        assert!(fields.is_filled("b"));
        assert!(!fields.is_filled("c"));
        assert!(!fields.is_filled("missing"));
    }

    #[test]
    fn test_repeated_key_keeps_first_filled_value() {
        let fields = FormFields::from_pairs([("d", "bot"), ("d", "")]);
        assert_eq!(fields.get("d"), Some("bot"));

        let fields = FormFields::from_pairs([("d", ""), ("d", "on")]);
        assert_eq!(fields.get("d"), Some("on"));
    }

    #[test]
    fn test_loopback_detection() {
        assert!(ClientId::new("127.0.0.1").is_loopback());
        assert!(ClientId::new("127.4.5.6").is_loopback());
        assert!(ClientId::new("::1").is_loopback());
        assert!(ClientId::new("::ffff:127.0.0.1").is_loopback());
        assert!(!ClientId::new("10.0.0.1").is_loopback());
        assert!(!ClientId::unknown().is_loopback());
    }
}
