//! Ban Store
//!
//! In-memory client bans with expiry. Eviction is lazy but runs on every
//! read under the same lock as inserts, so nobody sees a ban past its
//! expiry and nobody misses a ban that was just written.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::types::ActiveBan;
use crate::clock::SharedClock;
use crate::form::ClientId;

pub struct BanStore {
    clock: SharedClock,
    bans: Mutex<HashMap<ClientId, DateTime<Utc>>>,
}

impl BanStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            bans: Mutex::new(HashMap::new()),
        }
    }

    /// Check a client, evicting expired bans first
    pub fn is_banned(&self, client: &ClientId) -> bool {
        let now = self.clock.now();
        let mut bans = self.bans.lock();
        evict_expired(&mut bans, now);
        bans.contains_key(client)
    }

    /// Ban (or re-ban) a client until `now + duration`
    pub fn ban(&self, client: ClientId, duration: Duration) -> DateTime<Utc> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.bans.lock().insert(client.clone(), expires_at);

        tracing::warn!(client = %client, until = %expires_at, "client banned");
        expires_at
    }

    /// Remove a ban regardless of expiry. Returns whether it was still active.
    pub fn unban(&self, client: &ClientId) -> bool {
        let now = self.clock.now();
        let removed = self.bans.lock().remove(client);

        let was_active = removed.map_or(false, |expires_at| expires_at > now);
        if was_active {
            tracing::info!(client = %client, "client unbanned");
        }
        was_active
    }

    /// Expiry of an active ban
    pub fn expires_at(&self, client: &ClientId) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        let mut bans = self.bans.lock();
        evict_expired(&mut bans, now);
        bans.get(client).copied()
    }

    /// All active bans with remaining time, sorted by client
    pub fn list_active(&self) -> Vec<ActiveBan> {
        let now = self.clock.now();
        let mut bans = self.bans.lock();
        evict_expired(&mut bans, now);

        let mut active: Vec<ActiveBan> = bans
            .iter()
            .map(|(client, expires_at)| {
                let remaining_ms = expires_at.signed_duration_since(now).num_milliseconds().max(0) as u64;
                ActiveBan {
                    client_id: client.clone(),
                    expires_at: *expires_at,
                    remaining_secs: (remaining_ms + 999) / 1000,
                }
            })
            .collect();
        active.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        active
    }

    pub fn active_count(&self) -> usize {
        let now = self.clock.now();
        let mut bans = self.bans.lock();
        evict_expired(&mut bans, now);
        bans.len()
    }
}

fn evict_expired(bans: &mut HashMap<ClientId, DateTime<Utc>>, now: DateTime<Utc>) {
    bans.retain(|_, expires_at| *expires_at > now);
}
