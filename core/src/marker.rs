//! Submission Markers
//!
//! Every rendered form carries a signed token holding the marker id and the
//! issue time. The token is verified against a per-process secret when the
//! form comes back, so the issue time can't be forged and rendering never
//! allocates server-side state. Redeemed ids are remembered until their
//! marker expires, which makes each token single use.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::clock::{span_secs, SharedClock};
use crate::constants::{FOCUS_FIELD, FOCUS_SENTINEL, TIME_FIELD, TOKEN_FIELD};
use crate::decoy::DecoyRegistry;
use crate::form::FormFields;

type HmacSha256 = Hmac<Sha256>;

/// id (36) + '.' + micros (<= 20) + '.' + hex sha256 (64)
const MAX_TOKEN_LEN: usize = 128;

// Sets the focus sentinel on the first focus event of any control.
const FOCUS_SCRIPT: &str = r#"<script>document.addEventListener("DOMContentLoaded", function() {
  document.querySelectorAll("input, textarea, select").forEach(el => {
    el.addEventListener("focus", () => {
      document.getElementById("_hp_focus").value = 1;
    });
  });
});</script>"#;

// ============================================================================
// TYPES
// ============================================================================

/// Marker redeemed from a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionMarker {
    pub id: Uuid,
    pub issued_at: DateTime<Utc>,
    /// Submitted value of the focus field, if any
    pub focus_token: Option<String>,
}

impl SubmissionMarker {
    pub fn interacted(&self) -> bool {
        self.focus_token.as_deref().map(str::trim) == Some(FOCUS_SENTINEL)
    }
}

/// Result of the render-time hook
#[derive(Debug, Clone)]
pub struct IssuedForm {
    pub marker_id: Uuid,
    pub issued_at: DateTime<Utc>,
    /// Value of the hidden token field
    pub token: String,
    /// Embed verbatim inside the `<form>`
    pub markup: String,
}

struct SpentMarkers {
    /// Redeemed id -> issue time
    ids: HashMap<Uuid, DateTime<Utc>>,
    order: VecDeque<Uuid>,
}

// ============================================================================
// ISSUER
// ============================================================================

pub struct MarkerIssuer {
    registry: Arc<DecoyRegistry>,
    clock: SharedClock,
    secret: [u8; 64],
    spent: Mutex<SpentMarkers>,
    capacity: usize,
    ttl: Duration,
}

impl MarkerIssuer {
    /// `capacity` bounds how many redeemed ids are remembered for replay checks
    pub fn new(registry: Arc<DecoyRegistry>, clock: SharedClock, capacity: usize, ttl_secs: u64) -> Self {
        let mut secret = [0u8; 64];
        rand::thread_rng().fill(&mut secret[..]);

        Self {
            registry,
            clock,
            secret,
            spent: Mutex::new(SpentMarkers {
                ids: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
            ttl: span_secs(ttl_secs),
        }
    }

    /// Issue a marker and the hidden markup for one form render
    pub fn issue(&self, require_interaction: bool) -> IssuedForm {
        let now = self.clock.now();
        let id = Uuid::new_v4();
        let token = self.sign(id, now);

        let mut fields = vec![
            format!(
                r#"<input type="hidden" name="{}" value="{:.6}">"#,
                TIME_FIELD,
                now.timestamp_micros() as f64 / 1_000_000.0
            ),
            format!(r#"<input type="hidden" name="{}" value="{}">"#, TOKEN_FIELD, token),
        ];

        if require_interaction {
            fields.push(format!(
                r#"<input type="hidden" id="{0}" name="{0}" value="0">"#,
                FOCUS_FIELD
            ));
            fields.push(FOCUS_SCRIPT.to_string());
        }

        fields.push(self.registry.render());

        IssuedForm {
            marker_id: id,
            issued_at: now,
            token,
            markup: fields.join("\n"),
        }
    }

    /// Verify and consume the marker referenced by the submission.
    ///
    /// Missing, forged, expired and already redeemed tokens all yield `None`.
    pub fn redeem(&self, fields: &FormFields) -> Option<SubmissionMarker> {
        let (id, issued_at) = self.verify(fields.get(TOKEN_FIELD)?.trim())?;
        let now = self.clock.now();

        let age = now.signed_duration_since(issued_at);
        if age >= self.ttl || age < Duration::zero() {
            tracing::debug!(marker = %id, "expired marker presented");
            return None;
        }

        {
            let mut spent = self.spent.lock();
            self.prune(&mut spent, now);
            if spent.ids.contains_key(&id) {
                tracing::debug!(marker = %id, "replayed marker presented");
                return None;
            }
            while spent.ids.len() >= self.capacity {
                match spent.order.pop_front() {
                    Some(oldest) => {
                        spent.ids.remove(&oldest);
                    }
                    None => break,
                }
            }
            spent.ids.insert(id, issued_at);
            spent.order.push_back(id);
        }

        Some(SubmissionMarker {
            id,
            issued_at,
            focus_token: fields.get(FOCUS_FIELD).map(str::to_string),
        })
    }

    /// Redeemed markers still remembered for replay checks
    pub fn spent_count(&self) -> usize {
        self.spent.lock().ids.len()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    fn sign(&self, id: Uuid, issued_at: DateTime<Utc>) -> String {
        let payload = format!("{}.{}", id, issued_at.timestamp_micros());
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        format!("{}.{}", payload, hex::encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, raw: &str) -> Option<(Uuid, DateTime<Utc>)> {
        if raw.len() > MAX_TOKEN_LEN {
            return None;
        }
        let (payload, signature) = raw.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let (id, micros) = payload.split_once('.')?;
        let id = id.parse().ok()?;
        let issued_at = DateTime::<Utc>::from_timestamp_micros(micros.parse().ok()?)?;
        Some((id, issued_at))
    }

    fn prune(&self, spent: &mut SpentMarkers, now: DateTime<Utc>) {
        while let Some(front) = spent.order.front().copied() {
            let expired = match spent.ids.get(&front) {
                Some(issued_at) => now.signed_duration_since(*issued_at) >= self.ttl,
                None => true,
            };
            if !expired {
                break;
            }
            spent.order.pop_front();
            spent.ids.remove(&front);
        }
    }
}
