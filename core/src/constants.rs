//! Central Configuration Constants
//!
//! Single source of truth for all engine defaults and reserved field names.

/// Default legacy honeypot field name
pub const DEFAULT_FIELD_NAME: &str = "hp_field";

/// Hidden field carrying the render timestamp
pub const TIME_FIELD: &str = "_hp_time";

/// Hidden field carrying the marker id
pub const TOKEN_FIELD: &str = "_hp_token";

/// Hidden field set by the focus script
pub const FOCUS_FIELD: &str = "_hp_focus";

/// Value the focus script writes on first interaction
pub const FOCUS_SENTINEL: &str = "1";

/// Field names the engine renders itself; decoys may never reuse them
pub const RESERVED_FIELDS: [&str; 3] = [TIME_FIELD, TOKEN_FIELD, FOCUS_FIELD];

/// Candidate base names for unnamed decoys
pub const DECOY_NAME_POOL: [&str; 10] = [
    "email", "username", "name", "subscribe", "newsletter",
    "country", "region", "phone", "zipcode", "referrer",
];

/// Length of the random suffix appended to generated decoy names
pub const DECOY_SUFFIX_LEN: usize = 4;

/// Submissions faster than this (seconds) are not human
pub const DEFAULT_MIN_SUBMIT_SECS: f64 = 1.0;

/// Default ban duration (seconds)
pub const DEFAULT_BAN_DURATION_SECS: u64 = 3600;

/// Default notification cool-down per client (seconds)
pub const DEFAULT_NOTIFY_COOLDOWN_SECS: u64 = 60;

/// Default webhook request timeout (seconds)
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 5;

/// Default incident history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// Number of incidents shown on the admin page
pub const RECENT_INCIDENTS: usize = 50;

/// Default pending marker capacity
pub const DEFAULT_MARKER_CAPACITY: usize = 10_000;

/// Default lifetime of an unredeemed marker (seconds)
pub const DEFAULT_MARKER_TTL_SECS: u64 = 3600;

/// Cool-down map size above which elapsed entries are swept
pub const COOLDOWN_SWEEP_THRESHOLD: usize = 1024;

/// Longest configurable span (ban, cool-down, marker lifetime, timeout): 100 years
pub const MAX_SPAN_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Path prefix of the administrative surface (admin page and export)
pub const ADMIN_PATH_PREFIX: &str = "/honeypot/";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
