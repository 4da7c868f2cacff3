//! Submission Classifier
//!
//! Heuristics run in a fixed order and the first match wins:
//! timing, interaction, legacy field, decoy fields.
//! A missing marker counts as an instant submit.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::rules::ClassificationRules;
use super::types::Verdict;
use crate::clock::{elapsed_secs, SharedClock};
use crate::decoy::DecoyRegistry;
use crate::form::{FormFields, RequestContext};
use crate::incident::{IncidentLog, IncidentReason, IncidentRecord};
use crate::marker::SubmissionMarker;
use crate::response::{BanStore, NotificationDispatcher, TriggerAlert};

// ============================================================================
// DECISION
// ============================================================================

/// Pure decision; no side effects
pub fn evaluate(
    fields: &FormFields,
    marker: Option<&SubmissionMarker>,
    registry: &DecoyRegistry,
    rules: &ClassificationRules,
    now: DateTime<Utc>,
) -> Verdict {
    let elapsed = marker.map_or(0.0, |m| elapsed_secs(m.issued_at, now));
    if elapsed < rules.min_submit_secs {
        return Verdict::Deny(IncidentReason::FastSubmit);
    }

    if rules.require_interaction && !marker.map_or(false, SubmissionMarker::interacted) {
        return Verdict::Deny(IncidentReason::NoInteraction);
    }

    if let Some(field) = registry.legacy_field() {
        if fields.is_filled(field) {
            return Verdict::Deny(IncidentReason::LegacyFieldFilled { field: field.to_string() });
        }
    }

    if let Some(decoy) = registry.decoys().iter().find(|d| fields.is_filled(&d.name)) {
        return Verdict::Deny(IncidentReason::DecoyFieldFilled { field: decoy.name.clone() });
    }

    Verdict::Allow
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct Classifier {
    rules: ClassificationRules,
    registry: Arc<DecoyRegistry>,
    bans: Arc<BanStore>,
    notifier: Arc<NotificationDispatcher>,
    incidents: Arc<IncidentLog>,
    clock: SharedClock,
}

impl Classifier {
    pub fn new(
        rules: ClassificationRules,
        registry: Arc<DecoyRegistry>,
        bans: Arc<BanStore>,
        notifier: Arc<NotificationDispatcher>,
        incidents: Arc<IncidentLog>,
        clock: SharedClock,
    ) -> Self {
        Self { rules, registry, bans, notifier, incidents, clock }
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Classify a submission and, on deny, record, notify and ban (in that order)
    pub fn classify(
        &self,
        fields: &FormFields,
        marker: Option<&SubmissionMarker>,
        ctx: &RequestContext,
    ) -> Verdict {
        let now = self.clock.now();
        let verdict = evaluate(fields, marker, &self.registry, &self.rules, now);

        if let Verdict::Deny(ref reason) = verdict {
            self.on_trigger(reason, fields, ctx, now);
        }
        verdict
    }

    fn on_trigger(
        &self,
        reason: &IncidentReason,
        fields: &FormFields,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) {
        tracing::warn!(
            client = %ctx.client_id,
            path = %ctx.path,
            reason = %reason,
            "honeypot triggered"
        );
        if self.rules.debug_log {
            tracing::debug!(client = %ctx.client_id, form = ?fields, "submitted fields");
        }

        self.incidents.record(IncidentRecord {
            timestamp: now,
            client_id: ctx.client_id.clone(),
            path: ctx.path.clone(),
            reason: reason.clone(),
        });

        self.notifier.notify(TriggerAlert {
            client_id: ctx.client_id.clone(),
            path: ctx.path.clone(),
            reason: reason.to_string(),
            user_agent: ctx.user_agent.clone(),
            timestamp: now,
        });

        if self.rules.ban_on_trigger {
            self.bans.ban(ctx.client_id.clone(), self.rules.ban_duration());
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
