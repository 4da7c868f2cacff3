//! Decoy Types

use serde::{Deserialize, Serialize};

use super::escape_html;

/// How a decoy is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoyKind {
    Text,
    Checkbox,
    Select,
}

impl DecoyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecoyKind::Text => "text",
            DecoyKind::Checkbox => "checkbox",
            DecoyKind::Select => "select",
        }
    }
}

/// Decoy as written in configuration; the name is optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoyConfig {
    #[serde(rename = "type")]
    pub kind: DecoyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl DecoyConfig {
    pub fn new(kind: DecoyKind) -> Self {
        Self { kind, name: None, options: Vec::new() }
    }

    pub fn named(kind: DecoyKind, name: impl Into<String>) -> Self {
        Self { kind, name: Some(name.into()), options: Vec::new() }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Text, checkbox and a country select
    pub fn defaults() -> Vec<DecoyConfig> {
        vec![
            DecoyConfig::new(DecoyKind::Text),
            DecoyConfig::new(DecoyKind::Checkbox),
            DecoyConfig::new(DecoyKind::Select).with_options(["", "us", "ca", "uk"]),
        ]
    }
}

/// Finalized decoy with its unique name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoySpec {
    pub name: String,
    pub kind: DecoyKind,
    pub options: Vec<String>,
}

impl DecoySpec {
    /// Hidden, non-focusable control. Autofill scanners and naive form
    /// fillers still see it; a keyboard or mouse user never reaches it.
    pub fn render(&self) -> String {
        let name = escape_html(&self.name);
        match self.kind {
            DecoyKind::Text => format!(
                r#"<input class="required-input" type="text" name="{}" style="display:none" tabindex="-1" autocomplete="off">"#,
                name
            ),
            DecoyKind::Checkbox => format!(
                r#"<input class="required-input" type="checkbox" name="{}" style="display:none" tabindex="-1">"#,
                name
            ),
            DecoyKind::Select => {
                let options: String = self
                    .options
                    .iter()
                    .map(|o| {
                        let o = escape_html(o);
                        format!(r#"<option value="{}">{}</option>"#, o, o)
                    })
                    .collect();
                format!(
                    r#"<select class="required-input" name="{}" style="display:none" tabindex="-1">{}</select>"#,
                    name, options
                )
            }
        }
    }
}

/// Legacy single honeypot field
pub fn render_legacy_field(name: &str) -> String {
    format!(
        r#"<input class="real-field" type="text" name="{}" style="display:none" tabindex="-1" autocomplete="off">"#,
        escape_html(name)
    )
}
