//! Rate-limit state store.
//!
//! # Data Flow
//! ```text
//! RateLimiter
//!     → key_for(client ip)          "https://ratelimit/<ip>"
//!     → RateLimitStore::get / put   (best-effort mode)
//!     → RateLimitStore::update      (atomic mode)
//!     → memory.rs | redis.rs
//! ```
//!
//! # Design Decisions
//! - Records expire through the store's TTL, never by explicit deletion
//! - `get` and `put` are independent operations; composing them is racy
//! - `update` must apply its decision atomically with respect to other
//!   `update` calls on the same key

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Per-client counter for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Requests admitted in this window, always >= 1.
    pub count: u32,
    /// Window start, milliseconds since the Unix epoch.
    pub window_start: u64,
}

impl RateLimitRecord {
    /// First request of a new window.
    pub fn fresh(now_millis: u64) -> Self {
        Self {
            count: 1,
            window_start: now_millis,
        }
    }
}

/// Outcome of applying the window rules to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Admit the request and store this record.
    Admit(RateLimitRecord),
    /// Reject the request, leave the store untouched.
    Reject,
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit(_))
    }
}

/// Errors talking to the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Decision closure handed to [`RateLimitStore::update`].
pub type DecideFn<'a> = &'a (dyn Fn(Option<RateLimitRecord>) -> Decision + Send + Sync);

/// Key-value collaborator holding rate-limit records with TTL eviction.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Read the live record for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Write `record` under `key`, expiring after `ttl`.
    async fn put(&self, key: &str, record: RateLimitRecord, ttl: Duration)
        -> Result<(), StoreError>;

    /// Atomically read the record, apply `decide`, and store an admitted record.
    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        decide: DecideFn<'_>,
    ) -> Result<Decision, StoreError>;
}

/// Synthetic cache key for a client identity.
pub fn key_for(client_id: &str) -> String {
    format!("https://ratelimit/{client_id}")
}
