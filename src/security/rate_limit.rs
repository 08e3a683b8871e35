//! Fixed-window rate limiting per client identity.
//!
//! # Algorithm
//! ```text
//! record absent               → store {1, now},            admit
//! window elapsed              → store {1, now},            admit
//! count >= max_requests       → no write,                  reject
//! otherwise                   → store {count + 1, start},  admit
//! ```
//! Every write carries TTL = window length.
//!
//! # Consistency
//! In `BestEffort` mode the read and the write are separate store calls.
//! Two requests from the same client racing between them can both read the
//! same count and both be admitted, so the real number of admitted requests
//! may exceed `max_requests`. `Atomic` mode hands the same decision to
//! [`RateLimitStore::update`], which never overshoots.
//!
//! Store errors fail open: the request is admitted and the error logged.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::{Consistency, RateLimitConfig};
use crate::observability::metrics;
use crate::store::{key_for, Decision, RateLimitRecord, RateLimitStore, StoreError};

/// Apply the fixed-window rules to the stored record.
pub fn decide(
    current: Option<RateLimitRecord>,
    now_millis: u64,
    window: Duration,
    max_requests: u32,
) -> Decision {
    let window_millis = window.as_millis() as u64;
    match current {
        None => Decision::Admit(RateLimitRecord::fresh(now_millis)),
        Some(record) if now_millis.saturating_sub(record.window_start) >= window_millis => {
            Decision::Admit(RateLimitRecord::fresh(now_millis))
        }
        Some(record) if record.count >= max_requests => Decision::Reject,
        Some(record) => Decision::Admit(RateLimitRecord {
            count: record.count.saturating_add(1),
            window_start: record.window_start,
        }),
    }
}

/// Per-client fixed-window limiter over a shared store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    enabled: bool,
    max_requests: u32,
    window: Duration,
    consistency: Consistency,
}

impl RateLimiter {
    pub fn new(
        config: &RateLimitConfig,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            enabled: config.enabled,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            consistency: config.consistency,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns true if the request from `client_id` may proceed.
    pub async fn check(&self, client_id: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let key = key_for(client_id);
        let result = match self.consistency {
            Consistency::BestEffort => self.check_best_effort(&key).await,
            Consistency::Atomic => self.check_atomic(&key).await,
        };

        match result {
            Ok(decision) => decision.is_admitted(),
            Err((op, e)) => {
                tracing::error!(ip = %client_id, op, error = %e, "Rate limit error");
                metrics::record_store_error(op);
                true
            }
        }
    }

    async fn check_best_effort(&self, key: &str) -> Result<Decision, (&'static str, StoreError)> {
        let current = self.store.get(key).await.map_err(|e| ("get", e))?;
        let decision = decide(current, self.clock.now_millis(), self.window, self.max_requests);
        if let Decision::Admit(record) = decision {
            self.store
                .put(key, record, self.window)
                .await
                .map_err(|e| ("put", e))?;
        }
        Ok(decision)
    }

    async fn check_atomic(&self, key: &str) -> Result<Decision, (&'static str, StoreError)> {
        let now = self.clock.now_millis();
        let (window, max_requests) = (self.window, self.max_requests);
        self.store
            .update(key, window, &|current: Option<RateLimitRecord>| {
                decide(current, now, window, max_requests)
            })
            .await
            .map_err(|e| ("update", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{DecideFn, MemoryStore};
    use async_trait::async_trait;

    const WINDOW: Duration = Duration::from_secs(60);
    const T0: u64 = 1_700_000_000_000;

    fn config(max_requests: u32, consistency: Consistency) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs: WINDOW.as_secs(),
            consistency,
            ..RateLimitConfig::default()
        }
    }

    fn limiter(max_requests: u32, consistency: Consistency) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new(T0);
        let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
        let limiter = RateLimiter::new(
            &config(max_requests, consistency),
            store,
            Arc::new(clock.clone()),
        );
        (limiter, clock)
    }

    #[test]
    fn test_decide_rules() {
        assert_eq!(decide(None, T0, WINDOW, 3), Decision::Admit(RateLimitRecord::fresh(T0)));

        let record = RateLimitRecord { count: 2, window_start: T0 };
        assert_eq!(
            decide(Some(record), T0 + 1_000, WINDOW, 3),
            Decision::Admit(RateLimitRecord { count: 3, window_start: T0 })
        );

        let full = RateLimitRecord { count: 3, window_start: T0 };
        assert_eq!(decide(Some(full), T0 + 59_999, WINDOW, 3), Decision::Reject);
        assert_eq!(
            decide(Some(full), T0 + 60_000, WINDOW, 3),
            Decision::Admit(RateLimitRecord::fresh(T0 + 60_000))
        );
    }

    #[tokio::test]
    async fn test_first_n_admitted_then_rejected() {
        for consistency in [Consistency::BestEffort, Consistency::Atomic] {
            let (limiter, _) = limiter(3, consistency);
            for i in 0..3 {
                assert!(limiter.check("198.51.100.1").await, "request {} should pass", i + 1);
            }
            assert!(!limiter.check("198.51.100.1").await);
            assert!(!limiter.check("198.51.100.1").await);
            // Other clients have their own window
            assert!(limiter.check("198.51.100.2").await);
        }
    }

    #[tokio::test]
    async fn test_window_elapse_resets() {
        for consistency in [Consistency::BestEffort, Consistency::Atomic] {
            let (limiter, clock) = limiter(2, consistency);
            assert!(limiter.check("c").await);
            clock.advance(Duration::from_secs(30));
            assert!(limiter.check("c").await);
            assert!(!limiter.check("c").await);

            // The second write refreshed the TTL, so the record is still
            // stored here; the window start decides.
            clock.advance(Duration::from_secs(30));
            assert!(limiter.check("c").await);
        }
    }

    #[tokio::test]
    async fn test_disabled_never_touches_store() {
        let clock = ManualClock::new(T0);
        let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
        let mut cfg = config(1, Consistency::BestEffort);
        cfg.enabled = false;
        let limiter = RateLimiter::new(&cfg, store.clone(), Arc::new(clock));

        for _ in 0..10 {
            assert!(limiter.check("c").await);
        }
        assert!(store.is_empty());
    }

    struct BrokenStore;

    #[async_trait]
    impl RateLimitStore for BrokenStore {
        async fn get(&self, _: &str) -> Result<Option<RateLimitRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn put(&self, _: &str, _: RateLimitRecord, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn update(
            &self,
            _: &str,
            _: Duration,
            _: DecideFn<'_>,
        ) -> Result<Decision, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_store_errors_fail_open() {
        for consistency in [Consistency::BestEffort, Consistency::Atomic] {
            let limiter = RateLimiter::new(
                &config(1, consistency),
                Arc::new(BrokenStore),
                Arc::new(ManualClock::new(T0)),
            );
            for _ in 0..5 {
                assert!(limiter.check("c").await);
            }
        }
    }
}
