//! Decoy Registry
//!
//! Assigns every configured decoy its final name once, at startup.
//! Generated names are a pool word plus a random suffix so scripted
//! clients cannot match on a fixed signature.

use std::collections::HashSet;

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{DecoyConfig, DecoyKind, DecoySpec};
use crate::config::ConfigError;
use crate::constants::{DECOY_NAME_POOL, DECOY_SUFFIX_LEN, RESERVED_FIELDS};

/// Immutable set of decoys plus the legacy field name
#[derive(Debug, Clone)]
pub struct DecoyRegistry {
    legacy_field: Option<String>,
    decoys: Vec<DecoySpec>,
}

impl DecoyRegistry {
    /// Build with the thread-local RNG
    pub fn build(legacy_field: &str, configs: &[DecoyConfig]) -> Result<Self, ConfigError> {
        Self::build_with_rng(legacy_field, configs, &mut rand::thread_rng())
    }

    pub fn build_with_rng<R: Rng + ?Sized>(
        legacy_field: &str,
        configs: &[DecoyConfig],
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let legacy_field = Some(legacy_field.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        let mut taken: HashSet<String> = RESERVED_FIELDS.iter().map(|f| f.to_string()).collect();
        if let Some(ref field) = legacy_field {
            if !taken.insert(field.clone()) {
                return Err(ConfigError::DuplicateFieldName(field.clone()));
            }
        }

        // Explicit names first so the pool excludes them.
        let mut used_bases: HashSet<&str> = HashSet::new();
        for config in configs {
            if let Some(name) = explicit_name(config) {
                if !taken.insert(name.to_string()) {
                    return Err(ConfigError::DuplicateFieldName(name.to_string()));
                }
                used_bases.insert(name);
            }
        }

        let mut pool: Vec<&str> = DECOY_NAME_POOL
            .iter()
            .copied()
            .filter(|n| !used_bases.contains(n))
            .collect();

        let unnamed = configs.iter().filter(|c| explicit_name(c).is_none()).count();
        if unnamed > pool.len() {
            return Err(ConfigError::NamePoolExhausted {
                requested: unnamed,
                available: pool.len(),
            });
        }
        pool.shuffle(rng);

        let mut decoys = Vec::with_capacity(configs.len());
        for config in configs {
            let name = match explicit_name(config) {
                Some(name) => name.to_string(),
                None => {
                    // Checked above: one pool entry per unnamed decoy.
                    let base = pool.pop().unwrap_or("field");
                    loop {
                        let candidate = format!("{}_{}", base, random_suffix(rng));
                        if taken.insert(candidate.clone()) {
                            break candidate;
                        }
                    }
                }
            };

            let options = match config.kind {
                DecoyKind::Select if config.options.is_empty() => vec![String::new()],
                DecoyKind::Select => config.options.clone(),
                _ => Vec::new(),
            };

            decoys.push(DecoySpec { name, kind: config.kind, options });
        }

        tracing::info!(
            decoys = decoys.len(),
            legacy_field = legacy_field.as_deref().unwrap_or("-"),
            "decoy registry built"
        );

        Ok(Self { legacy_field, decoys })
    }

    pub fn legacy_field(&self) -> Option<&str> {
        self.legacy_field.as_deref()
    }

    pub fn decoys(&self) -> &[DecoySpec] {
        &self.decoys
    }

    /// Legacy field followed by all decoy names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.legacy_field
            .as_deref()
            .into_iter()
            .chain(self.decoys.iter().map(|d| d.name.as_str()))
    }

    /// Markup for the legacy field and every decoy
    pub fn render(&self) -> String {
        let mut html = String::new();
        if let Some(ref field) = self.legacy_field {
            html.push_str(&super::types::render_legacy_field(field));
        }
        for decoy in &self.decoys {
            html.push_str(&decoy.render());
        }
        html
    }
}

fn explicit_name(config: &DecoyConfig) -> Option<&str> {
    config.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..DECOY_SUFFIX_LEN)
        .map(|_| (rng.sample(Alphanumeric) as char).to_ascii_lowercase())
        .collect()
}
