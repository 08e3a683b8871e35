//! Redis-backed rate-limit store, shared across gateway instances.
//!
//! Records are stored as JSON strings with a native Redis expiry. `update`
//! is an optimistic compare-and-set loop: read, decide locally, then swap
//! only if the stored value is still the one that was read.

use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Script};
use async_trait::async_trait;

use crate::store::{DecideFn, Decision, RateLimitRecord, RateLimitStore, StoreError};

/// KEYS[1] = key, ARGV[1] = expected raw value (`""` for absent),
/// ARGV[2] = new value, ARGV[3] = TTL in milliseconds.
const COMPARE_AND_SET: &str = r#"
local current = redis.call('GET', KEYS[1])
if (current == false and ARGV[1] == '') or current == ARGV[1] then
  redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
  return 1
end
return 0
"#;

const MAX_CAS_ATTEMPTS: usize = 16;

impl From<::redis::RedisError> for StoreError {
    fn from(e: ::redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    compare_and_set: Script,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(url = %sanitize_url(url), "Connected to Redis rate-limit store");
        Ok(Self {
            conn,
            compare_and_set: Script::new(COMPARE_AND_SET),
        })
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        Ok(raw)
    }
}

/// `url` with any password replaced by `***`, for logging.
fn sanitize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid_url".to_string(),
    }
}

/// `SET EX` takes whole seconds; sub-second TTLs round up to one.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// `PX` value for the compare-and-set script, never zero.
fn expiry_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

fn decode(raw: Option<&str>) -> Result<Option<RateLimitRecord>, StoreError> {
    raw.map(serde_json::from_str::<RateLimitRecord>)
        .transpose()
        .map_err(StoreError::from)
}

/// Expected value handed to the script; an absent key is the empty string.
fn expected(raw: Option<&str>) -> &str {
    raw.unwrap_or("")
}

fn unsettled(key: &str) -> StoreError {
    StoreError::Unavailable(format!(
        "compare-and-set on {key} did not settle after {MAX_CAS_ATTEMPTS} attempts"
    ))
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let raw = self.get_raw(key).await?;
        decode(raw.as_deref())
    }

    async fn put(
        &self,
        key: &str,
        record: RateLimitRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_string(&record)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, expiry_secs(ttl)).await?;
        Ok(())
    }

    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        decide: DecideFn<'_>,
    ) -> Result<Decision, StoreError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let raw = self.get_raw(key).await?;
            let decision = decide(decode(raw.as_deref())?);
            let Decision::Admit(record) = decision else {
                return Ok(decision);
            };

            let mut conn = self.conn.clone();
            let swapped: i32 = self
                .compare_and_set
                .key(key)
                .arg(expected(raw.as_deref()))
                .arg(serde_json::to_string(&record)?)
                .arg(expiry_millis(ttl))
                .invoke_async(&mut conn)
                .await?;
            if swapped == 1 {
                return Ok(decision);
            }
            tracing::debug!(key = %key, "Rate-limit record changed concurrently, retrying swap");
        }

        Err(unsettled(key))
    }
}
