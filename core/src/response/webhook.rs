//! Webhook Alerts
//!
//! Best-effort trigger alerts to Discord, Slack or generic JSON endpoints.
//!
//! - At most one burst per client per cool-down window, whatever the
//!   delivery outcome.
//! - The cool-down lock is never held across network I/O.
//! - Each endpoint is tried independently with a bounded timeout; failures
//!   are logged and counted, never returned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::types::{
    validate_url, DeliveryError, DeliveryReport, DispatcherStats, NotifyOutcome, TriggerAlert,
    WebhookEndpoint, WebhookPlatform,
};
use crate::clock::{span_secs, SharedClock};
use crate::config::ConfigError;
use crate::constants::{COOLDOWN_SWEEP_THRESHOLD, MAX_SPAN_SECS};
use crate::form::ClientId;

const ALERT_TITLE: &str = "\u{1F6A8} Honeypot Triggered";
const ALERT_COLOR: u32 = 15158332;

// ============================================================================
// DISPATCHER
// ============================================================================

#[derive(Default)]
struct Counters {
    attempts: AtomicU64,
    suppressed: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

pub struct NotificationDispatcher {
    endpoints: Arc<Vec<WebhookEndpoint>>,
    http_client: reqwest::Client,
    cooldown: Duration,
    clock: SharedClock,
    last_sent: Mutex<HashMap<ClientId, DateTime<Utc>>>,
    counters: Arc<Counters>,
}

impl NotificationDispatcher {
    pub fn new(
        endpoints: Vec<WebhookEndpoint>,
        timeout_secs: u64,
        cooldown_secs: u64,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        for endpoint in &endpoints {
            validate_url(&endpoint.url)?;
        }

        let http_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(timeout_secs.clamp(1, MAX_SPAN_SECS)))
            .build()?;

        tracing::info!(
            endpoints = endpoints.len(),
            cooldown_secs,
            "notification dispatcher ready"
        );

        Ok(Self {
            endpoints: Arc::new(endpoints),
            http_client,
            cooldown: span_secs(cooldown_secs),
            clock,
            last_sent: Mutex::new(HashMap::new()),
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn endpoints(&self) -> &[WebhookEndpoint] {
        &self.endpoints
    }

    /// Notify about a trigger unless the client is inside its cool-down.
    ///
    /// Never fails and never waits for the network.
    pub fn notify(&self, alert: TriggerAlert) -> NotifyOutcome {
        let now = self.clock.now();
        if !self.claim(&alert.client_id, now) {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(client = %alert.client_id, "alert suppressed by cool-down");
            return NotifyOutcome::Suppressed;
        }
        self.counters.attempts.fetch_add(1, Ordering::Relaxed);

        if self.endpoints.is_empty() {
            return NotifyOutcome::NoEndpoints;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.counters
                    .failed
                    .fetch_add(self.endpoints.len() as u64, Ordering::Relaxed);
                tracing::error!(client = %alert.client_id, "no async runtime, alert dropped");
                return NotifyOutcome::NoRuntime;
            }
        };

        let http_client = self.http_client.clone();
        let endpoints = self.endpoints.clone();
        let counters = self.counters.clone();

        NotifyOutcome::Dispatched(runtime.spawn(async move {
            deliver_all(&http_client, &endpoints, &alert, &counters).await
        }))
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            attempts: self.counters.attempts.load(Ordering::Relaxed),
            suppressed: self.counters.suppressed.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            tracked_clients: self.last_sent.lock().len(),
        }
    }

    /// Check and stamp the cool-down in one critical section
    fn claim(&self, client: &ClientId, now: DateTime<Utc>) -> bool {
        let mut last_sent = self.last_sent.lock();

        if let Some(sent_at) = last_sent.get(client) {
            if now.signed_duration_since(*sent_at) <= self.cooldown {
                return false;
            }
        }

        // Entries past their window cannot suppress anything.
        if last_sent.len() >= COOLDOWN_SWEEP_THRESHOLD {
            let cooldown = self.cooldown;
            last_sent.retain(|_, sent_at| now.signed_duration_since(*sent_at) <= cooldown);
        }

        last_sent.insert(client.clone(), now);
        true
    }
}

// ============================================================================
// DELIVERY
// ============================================================================

async fn deliver_all(
    http_client: &reqwest::Client,
    endpoints: &[WebhookEndpoint],
    alert: &TriggerAlert,
    counters: &Counters,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for endpoint in endpoints {
        match deliver(http_client, endpoint, alert).await {
            Ok(status) => {
                report.delivered += 1;
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    platform = endpoint.platform.as_str(),
                    status,
                    client = %alert.client_id,
                    "alert delivered"
                );
            }
            Err(e) => {
                report.failed += 1;
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(url = %endpoint.url, error = %e, "failed to send webhook");
            }
        }
    }

    report
}

async fn deliver(
    http_client: &reqwest::Client,
    endpoint: &WebhookEndpoint,
    alert: &TriggerAlert,
) -> Result<u16, DeliveryError> {
    let response = http_client
        .post(&endpoint.url)
        .json(&format_payload(endpoint.platform, alert))
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        Ok(status.as_u16())
    } else {
        Err(DeliveryError::Status(status.as_u16()))
    }
}

// ============================================================================
// FORMATTING
// ============================================================================

/// Body for the given platform
pub fn format_payload(platform: WebhookPlatform, alert: &TriggerAlert) -> serde_json::Value {
    match platform {
        WebhookPlatform::Discord => format_discord(alert),
        WebhookPlatform::Slack => format_slack(alert),
        WebhookPlatform::Generic => format_generic(alert),
    }
}

fn user_agent(alert: &TriggerAlert) -> &str {
    alert.user_agent.as_deref().unwrap_or("N/A")
}

fn format_discord(alert: &TriggerAlert) -> serde_json::Value {
    serde_json::json!({
        "content": null,
        "embeds": [{
            "title": ALERT_TITLE,
            "color": ALERT_COLOR,
            "fields": [
                { "name": "IP", "value": alert.client_id.as_str(), "inline": true },
                { "name": "Path", "value": alert.path, "inline": true },
                { "name": "Reason", "value": alert.reason, "inline": false },
                { "name": "User-Agent", "value": user_agent(alert), "inline": false }
            ],
            "timestamp": alert.timestamp.to_rfc3339()
        }]
    })
}

fn format_slack(alert: &TriggerAlert) -> serde_json::Value {
    serde_json::json!({
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": ALERT_TITLE, "emoji": true }
            },
            {
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*IP:* {}", alert.client_id) },
                    { "type": "mrkdwn", "text": format!("*Path:* {}", alert.path) },
                    { "type": "mrkdwn", "text": format!("*Reason:* {}", alert.reason) },
                    { "type": "mrkdwn", "text": format!("*User-Agent:* {}", user_agent(alert)) }
                ]
            }
        ]
    })
}

fn format_generic(alert: &TriggerAlert) -> serde_json::Value {
    serde_json::to_value(alert).unwrap_or_else(|_| serde_json::json!({}))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert(client: &str) -> TriggerAlert {
        TriggerAlert {
            client_id: ClientId::new(client),
            path: "/contact".to_string(),
            reason: "suspiciously fast submit".to_string(),
            user_agent: Some("curl/8.0".to_string()),
            timestamp: Utc::now(),
        }
    }

    fn dispatcher(endpoints: Vec<WebhookEndpoint>, clock: Arc<ManualClock>) -> NotificationDispatcher {
        NotificationDispatcher::new(endpoints, 2, 60, clock).unwrap()
    }

    async fn wait(outcome: NotifyOutcome) -> DeliveryReport {
        match outcome {
            NotifyOutcome::Dispatched(handle) => handle.await.unwrap(),
            other => panic!("expected dispatch, got {:?}", other),
        }
    }

    #[test]
    fn test_cooldown_without_endpoints() {
        let clock = Arc::new(ManualClock::starting_now());
        let dispatcher = dispatcher(Vec::new(), clock.clone());

        assert!(matches!(dispatcher.notify(alert("1.2.3.4")), NotifyOutcome::NoEndpoints));
        assert!(matches!(dispatcher.notify(alert("1.2.3.4")), NotifyOutcome::Suppressed));
        assert!(matches!(dispatcher.notify(alert("5.6.7.8")), NotifyOutcome::NoEndpoints));

        clock.advance(Duration::seconds(60));
        assert!(matches!(dispatcher.notify(alert("1.2.3.4")), NotifyOutcome::Suppressed));

        clock.advance(Duration::milliseconds(1));
        assert!(matches!(dispatcher.notify(alert("1.2.3.4")), NotifyOutcome::NoEndpoints));

        let stats = dispatcher.stats();
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.suppressed, 2);
    }

    #[test]
    fn test_sweep_drops_only_elapsed_entries() {
        let clock = Arc::new(ManualClock::starting_now());
        let dispatcher = dispatcher(Vec::new(), clock.clone());

        for i in 0..COOLDOWN_SWEEP_THRESHOLD {
            dispatcher.notify(alert(&format!("old-{}", i)));
        }
        clock.advance(Duration::seconds(61));
        dispatcher.notify(alert("recent"));

        assert_eq!(dispatcher.stats().tracked_clients, 1);
        assert!(matches!(dispatcher.notify(alert("recent")), NotifyOutcome::Suppressed));
    }

    #[test]
    fn test_concurrent_triggers_claim_one_burst() {
        let clock = Arc::new(ManualClock::starting_now());
        let dispatcher = Arc::new(dispatcher(Vec::new(), clock));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| dispatcher.notify(alert("1.2.3.4")).is_attempt())
                        .count()
                })
            })
            .collect();
        let claimed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(claimed, 1);
        let stats = dispatcher.stats();
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.suppressed, 399);
    }

    #[test]
    fn test_no_runtime_is_swallowed() {
        let clock = Arc::new(ManualClock::starting_now());
        let endpoint = WebhookEndpoint::parse("http://127.0.0.1:9/hook").unwrap();
        let dispatcher = dispatcher(vec![endpoint], clock);

        assert!(matches!(dispatcher.notify(alert("1.2.3.4")), NotifyOutcome::NoRuntime));
        assert_eq!(dispatcher.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_discord_payload_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/token"))
            .and(body_partial_json(serde_json::json!({
                "embeds": [{ "title": ALERT_TITLE, "color": ALERT_COLOR }]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = WebhookEndpoint::with_platform(
            &format!("{}/api/webhooks/1/token", server.uri()),
            WebhookPlatform::Discord,
        )
        .unwrap();
        let dispatcher = dispatcher(vec![endpoint], Arc::new(ManualClock::starting_now()));

        let report = wait(dispatcher.notify(alert("1.2.3.4"))).await;
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 0 });
        assert_eq!(dispatcher.stats().delivered, 1);
    }

    #[tokio::test]
    async fn test_failing_endpoint_does_not_block_others() {
        let broken = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&broken)
            .await;

        let healthy = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "client_id": "1.2.3.4" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&healthy)
            .await;

        let endpoints = vec![
            WebhookEndpoint::parse("http://127.0.0.1:9/unreachable").unwrap(),
            WebhookEndpoint::parse(&format!("{}/hook", broken.uri())).unwrap(),
            WebhookEndpoint::parse(&format!("{}/hook", healthy.uri())).unwrap(),
        ];
        let dispatcher = dispatcher(endpoints, Arc::new(ManualClock::starting_now()));

        let report = wait(dispatcher.notify(alert("1.2.3.4"))).await;
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 2 });
    }

    #[tokio::test]
    async fn test_one_burst_per_cooldown_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::starting_now());
        let endpoint = WebhookEndpoint::parse(&format!("{}/hook", server.uri())).unwrap();
        let dispatcher = dispatcher(vec![endpoint], clock.clone());

        wait(dispatcher.notify(alert("1.2.3.4"))).await;
        assert!(matches!(dispatcher.notify(alert("1.2.3.4")), NotifyOutcome::Suppressed));

        clock.advance(Duration::seconds(61));
        wait(dispatcher.notify(alert("1.2.3.4"))).await;

        assert_eq!(dispatcher.stats().attempts, 2);
    }

    #[test]
    fn test_slack_and_generic_formats() {
        let alert = alert("9.9.9.9");

        let slack = format_payload(WebhookPlatform::Slack, &alert).to_string();
        assert!(slack.contains("blocks"));
        assert!(slack.contains("*IP:* 9.9.9.9"));

        let generic = format_payload(WebhookPlatform::Generic, &alert);
        assert_eq!(generic["client_id"], "9.9.9.9");
        assert_eq!(generic["path"], "/contact");
        assert_eq!(generic["user_agent"], "curl/8.0");
    }
}
