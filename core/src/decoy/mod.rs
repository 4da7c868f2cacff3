//! Decoy Fields
//!
//! Hidden form controls that only automated clients fill in.
//!
//! ## Structure
//! - `types`: configuration and finalized decoy descriptors, rendering
//! - `registry`: one-time name assignment

pub mod registry;
pub mod types;

pub use registry::DecoyRegistry;
pub use types::{DecoyConfig, DecoyKind, DecoySpec};

// ============================================================================
// UTILITIES
// ============================================================================

/// Escape text for use inside HTML attribute values and element content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
