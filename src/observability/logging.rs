//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (JSON or pretty)
//! - Build the level filter from config, overridable by `RUST_LOG`
//! - Silence per-request gateway events when `log_enabled = false`
//!
//! Gateway events (denials, rate-limit rejections, proxied requests, proxy
//! errors) are emitted under the [`ACCESS_LOG`] target. Everything else,
//! including rate-limit store errors, is unaffected by `log_enabled`.

use tracing_subscriber::filter::{Directive, EnvFilter, ParseError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, ObservabilityConfig};

/// Target for one-line-per-request gateway events.
pub const ACCESS_LOG: &str = "edge_gateway::access";

/// Level filter for `config`. `RUST_LOG`, when set and valid, replaces the
/// configured level.
pub fn build_filter(config: &ObservabilityConfig) -> Result<EnvFilter, ParseError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "edge_gateway={level},tower_http={level}",
            level = config.log_level
        ))?,
    };

    if config.log_enabled {
        Ok(filter)
    } else {
        let off: Directive = format!("{ACCESS_LOG}=off").parse()?;
        Ok(filter.add_directive(off))
    }
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
    }
    Ok(())
}
