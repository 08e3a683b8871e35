//! Process-local rate-limit store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::clock::{Clock, SystemClock};
use crate::store::{DecideFn, Decision, RateLimitRecord, RateLimitStore, StoreError};

#[derive(Debug, Clone, Copy)]
struct StoredRecord {
    record: RateLimitRecord,
    expires_at: u64,
}

impl StoredRecord {
    fn new(record: RateLimitRecord, now: u64, ttl: Duration) -> Self {
        Self {
            record,
            expires_at: now.saturating_add(ttl.as_millis() as u64),
        }
    }

    fn is_live(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// In-memory store with TTL expiry evaluated against an injected clock.
///
/// Expired records are invisible to readers immediately and are physically
/// removed on the next access or by [`MemoryStore::purge_expired`].
#[derive(Clone, Debug)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, StoredRecord>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(
                removed_entries = removed,
                remaining_entries = self.entries.len(),
                "Rate-limit store purge completed"
            );
        }
        removed
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let now = self.clock.now_millis();
        let stored = self.entries.get(key).map(|r| *r.value());
        match stored {
            Some(stored) if stored.is_live(now) => Ok(Some(stored.record)),
            Some(_) => {
                self.entries.remove_if(key, |_, stored| !stored.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        record: RateLimitRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        self.entries
            .insert(key.to_string(), StoredRecord::new(record, now, ttl));
        Ok(())
    }

    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        decide: DecideFn<'_>,
    ) -> Result<Decision, StoreError> {
        let now = self.clock.now_millis();
        // The entry guard holds the shard lock until the decision is stored.
        let decision = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = Some(*occupied.get())
                    .filter(|stored| stored.is_live(now))
                    .map(|stored| stored.record);
                let decision = decide(current);
                if let Decision::Admit(record) = decision {
                    occupied.insert(StoredRecord::new(record, now, ttl));
                }
                decision
            }
            Entry::Vacant(vacant) => {
                let decision = decide(None);
                if let Decision::Admit(record) = decision {
                    vacant.insert(StoredRecord::new(record, now, ttl));
                }
                decision
            }
        };
        Ok(decision)
    }
}
