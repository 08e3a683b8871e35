//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and metrics from configuration
//! - Connect the configured rate-limit store
//! - Build the server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::{GatewayConfig, StoreKind};
use crate::http::HttpServer;
use crate::observability::{logging, metrics};
use crate::proxy::ForwardError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("logging: {0}")]
    Logging(Box<dyn std::error::Error + Send + Sync>),

    #[error("metrics: {0}")]
    Metrics(String),

    #[error("rate-limit store: {0}")]
    Store(#[from] StoreError),

    #[error("upstream: {0}")]
    Upstream(#[from] ForwardError),
}

/// Install the tracing subscriber and, if enabled, the metrics exporter.
pub fn init_observability(config: &GatewayConfig) -> Result<(), StartupError> {
    logging::init(&config.observability).map_err(StartupError::Logging)?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e: std::net::AddrParseError| StartupError::Metrics(e.to_string()))?;
        metrics::init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
    }
    Ok(())
}

/// Build the server with the store selected in `config`.
pub async fn build_server(config: GatewayConfig) -> Result<HttpServer, StartupError> {
    match config.rate_limit.store {
        StoreKind::Memory => Ok(HttpServer::new(config)?),
        StoreKind::Redis => build_redis_server(config).await,
    }
}

#[cfg(feature = "redis")]
async fn build_redis_server(config: GatewayConfig) -> Result<HttpServer, StartupError> {
    let store = crate::store::RedisStore::connect(&config.rate_limit.redis_url).await?;
    Ok(HttpServer::with_store(
        config,
        std::sync::Arc::new(store),
        std::sync::Arc::new(crate::clock::SystemClock),
    )?)
}

#[cfg(not(feature = "redis"))]
async fn build_redis_server(_config: GatewayConfig) -> Result<HttpServer, StartupError> {
    Err(StartupError::Store(StoreError::Unavailable(
        "built without the `redis` feature".to_string(),
    )))
}
