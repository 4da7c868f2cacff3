//! FormTrap Engine
//!
//! Owns one instance of every component, built once at startup and shared
//! by handle with the web layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::{span_secs, SharedClock, SystemClock};
use crate::config::{ConfigError, TrapConfig};
use crate::constants::{ADMIN_PATH_PREFIX, RECENT_INCIDENTS};
use crate::decoy::DecoyRegistry;
use crate::form::{ClientId, FormFields, RequestContext};
use crate::incident::{to_csv, IncidentLog, IncidentRecord, IncidentStats};
use crate::marker::{IssuedForm, MarkerIssuer};
use crate::response::{ActiveBan, BanStore, DispatcherStats, NotificationDispatcher};
use crate::threat::{ClassificationRules, Classifier, Verdict};

// ============================================================================
// TYPES
// ============================================================================

/// Decision taken before any handler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Continue to the handler (and classify if it is a submission)
    Pass,
    /// Trusted admin request; skip ban checks
    Bypass,
    /// Client is banned; reject without running the handler
    Banned,
}

/// What the web layer does with a denied submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    Redirect(String),
    Deny,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrapStats {
    pub active_bans: usize,
    pub spent_markers: usize,
    pub incidents: IncidentStats,
    pub notifications: DispatcherStats,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct FormTrap {
    config: TrapConfig,
    clock: SharedClock,
    registry: Arc<DecoyRegistry>,
    markers: MarkerIssuer,
    bans: Arc<BanStore>,
    notifier: Arc<NotificationDispatcher>,
    incidents: Arc<IncidentLog>,
    classifier: Classifier,
}

impl FormTrap {
    pub fn new(config: TrapConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TrapConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = Arc::new(DecoyRegistry::build(&config.field_name, &config.decoys)?);
        let markers = MarkerIssuer::new(
            registry.clone(),
            clock.clone(),
            config.marker_capacity,
            config.marker_ttl_secs,
        );
        let bans = Arc::new(BanStore::new(clock.clone()));
        let notifier = Arc::new(NotificationDispatcher::new(
            config.webhooks.clone(),
            config.webhook_timeout_secs,
            config.notify_cooldown_secs,
            clock.clone(),
        )?);
        let incidents = Arc::new(IncidentLog::new(config.history_capacity));
        let classifier = Classifier::new(
            ClassificationRules::from_config(&config),
            registry.clone(),
            bans.clone(),
            notifier.clone(),
            incidents.clone(),
            clock.clone(),
        );

        tracing::info!(
            ban_ip = config.ban_ip,
            require_interaction = config.require_field_interaction,
            admin = config.enable_admin,
            "formtrap engine ready"
        );

        Ok(Self {
            config,
            clock,
            registry,
            markers,
            bans,
            notifier,
            incidents,
            classifier,
        })
    }

    pub fn config(&self) -> &TrapConfig {
        &self.config
    }

    pub fn registry(&self) -> &DecoyRegistry {
        &self.registry
    }

    pub fn bans(&self) -> &BanStore {
        &self.bans
    }

    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    pub fn incidents(&self) -> &IncidentLog {
        &self.incidents
    }

    // ------------------------------------------------------------------------
    // Render-time hook
    // ------------------------------------------------------------------------

    pub fn render(&self, require_interaction: bool) -> IssuedForm {
        self.markers.issue(require_interaction)
    }

    /// Render with the configured interaction setting
    pub fn render_form(&self) -> IssuedForm {
        self.render(self.config.require_field_interaction)
    }

    // ------------------------------------------------------------------------
    // Request-time hooks
    // ------------------------------------------------------------------------

    pub fn is_admin_path(path: &str) -> bool {
        path.starts_with(ADMIN_PATH_PREFIX)
    }

    pub fn gate(&self, ctx: &RequestContext) -> GateDecision {
        if self.config.enable_admin && Self::is_admin_path(&ctx.path) && ctx.client_id.is_loopback() {
            return GateDecision::Bypass;
        }
        if self.bans.is_banned(&ctx.client_id) {
            tracing::debug!(client = %ctx.client_id, path = %ctx.path, "banned client rejected");
            return GateDecision::Banned;
        }
        GateDecision::Pass
    }

    /// Redeem the submission's marker and classify it
    pub fn inspect(&self, fields: &FormFields, ctx: &RequestContext) -> Verdict {
        let marker = self.markers.redeem(fields);
        self.classifier.classify(fields, marker.as_ref(), ctx)
    }

    pub fn on_trigger(&self) -> TriggerAction {
        if self.config.redirect_on_trigger {
            TriggerAction::Redirect(self.config.redirect_to.clone())
        } else {
            TriggerAction::Deny
        }
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    pub fn active_bans(&self) -> Vec<ActiveBan> {
        self.bans.list_active()
    }

    /// Ban for the configured duration
    pub fn manual_ban(&self, client: ClientId) -> DateTime<Utc> {
        tracing::info!(client = %client, "manual ban");
        self.bans.ban(client, span_secs(self.config.ban_duration_secs))
    }

    pub fn unban(&self, client: &ClientId) -> bool {
        self.bans.unban(client)
    }

    pub fn recent_incidents(&self) -> Vec<IncidentRecord> {
        self.incidents.recent(RECENT_INCIDENTS)
    }

    pub fn export_incidents(&self) -> Vec<IncidentRecord> {
        self.incidents.export_all()
    }

    pub fn export_csv(&self) -> Result<Vec<u8>, csv::Error> {
        to_csv(&self.incidents.export_all())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn stats(&self) -> TrapStats {
        TrapStats {
            active_bans: self.bans.active_count(),
            spent_markers: self.markers.spent_count(),
            incidents: self.incidents.stats(),
            notifications: self.notifier.stats(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
