//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, mount path).
    pub listener: ListenerConfig,

    /// The single upstream origin every permitted request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Trusted client identity headers.
    pub client: ClientConfig,

    /// IP and region denylists.
    pub access: AccessConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path prefix the gateway is mounted under. Everything after it is
    /// treated as the routed path.
    pub mount_path: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            mount_path: "/".to_string(),
        }
    }
}

/// Upstream origin and client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin URL (scheme + host, optionally port). Its path is replaced per request.
    pub origin: String,

    /// Maximum number of upstream redirects followed before giving up.
    pub max_redirects: usize,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Largest request body buffered for forwarding, in bytes. Uploads
    /// through the gateway are capped at this size; larger bodies get 413.
    pub max_body_bytes: usize,

    /// Name of the header added to every relayed response.
    pub marker_header: String,

    /// Value of the marker header.
    pub marker_value: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "https://example.com".to_string(),
            max_redirects: 10,
            connect_timeout_secs: 10,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            marker_header: "X-Proxy-By".to_string(),
            marker_value: "edge-gateway".to_string(),
        }
    }
}

/// Where client identity comes from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Header carrying the client IP, set by trusted edge infrastructure.
    pub ip_header: String,

    /// Header carrying the client's ISO 3166-1 alpha-2 region.
    pub region_header: String,

    /// Use the TCP peer address when the IP header is missing.
    pub peer_fallback: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ip_header: "CF-Connecting-IP".to_string(),
            region_header: "CF-IPCountry".to_string(),
            peer_fallback: false,
        }
    }
}

/// Static denylists.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Client IPs that are always rejected.
    pub blocked_ips: Vec<String>,

    /// ISO 3166-1 alpha-2 region codes that are always rejected.
    pub blocked_regions: Vec<String>,
}

/// How the rate limiter composes its store operations.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Independent get and put. Concurrent requests may overshoot the quota.
    #[default]
    BestEffort,
    /// Single atomic read-modify-write inside the store.
    Atomic,
}

/// Which store backs rate-limit records.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Process-local map. Not shared between gateway instances.
    #[default]
    Memory,
    /// Redis, shared between instances. Requires the `redis` feature.
    Redis,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// Window length in seconds. Also the record TTL and the Retry-After value.
    pub window_secs: u64,

    /// Store operation composition.
    pub consistency: Consistency,

    /// Store backend.
    pub store: StoreKind,

    /// Redis connection URL, used when `store = "redis"`.
    pub redis_url: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 30,
            window_secs: 60,
            consistency: Consistency::BestEffort,
            store: StoreKind::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Emit per-request gateway log lines (denials, rejections, proxied requests).
    pub log_enabled: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_enabled: true,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
