//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, max requests > 0)
//! - Check the upstream origin and listener address are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, StoreKind};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.mount_path `{0}` must start with '/'")]
    MountPath(String),

    #[error("upstream.origin `{0}` is not an http(s) URL with a host")]
    Origin(String),

    #[error("upstream.{field} `{value}` is not a valid header {part}")]
    MarkerHeader {
        field: &'static str,
        value: String,
        part: &'static str,
    },

    #[error("client.{field} `{value}` is not a valid header name")]
    ClientHeader { field: &'static str, value: String },

    #[error("access.blocked_regions entry `{0}` is not a two-character region code")]
    RegionCode(String),

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.store = \"redis\" requires the `redis` feature")]
    RedisUnavailable,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if !config.listener.mount_path.starts_with('/') {
        errors.push(ValidationError::MountPath(config.listener.mount_path.clone()));
    }

    if !is_valid_origin(&config.upstream.origin) {
        errors.push(ValidationError::Origin(config.upstream.origin.clone()));
    }
    if axum::http::HeaderName::try_from(config.upstream.marker_header.as_str()).is_err() {
        errors.push(ValidationError::MarkerHeader {
            field: "marker_header",
            value: config.upstream.marker_header.clone(),
            part: "name",
        });
    }
    if axum::http::HeaderValue::try_from(config.upstream.marker_value.as_str()).is_err() {
        errors.push(ValidationError::MarkerHeader {
            field: "marker_value",
            value: config.upstream.marker_value.clone(),
            part: "value",
        });
    }

    for (field, value) in [
        ("ip_header", &config.client.ip_header),
        ("region_header", &config.client.region_header),
    ] {
        if axum::http::HeaderName::try_from(value.as_str()).is_err() {
            errors.push(ValidationError::ClientHeader {
                field,
                value: value.clone(),
            });
        }
    }

    for region in &config.access.blocked_regions {
        if !is_region_code(region) {
            errors.push(ValidationError::RegionCode(region.clone()));
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::ZeroMaxRequests);
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroWindow);
        }
        if config.rate_limit.store == StoreKind::Redis && !cfg!(feature = "redis") {
            errors.push(ValidationError::RedisUnavailable);
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Two ASCII alphanumerics: ISO 3166-1 alpha-2 plus edge pseudo-codes
/// such as `T1` (Tor) and `XX` (unknown).
fn is_region_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphanumeric())
}
