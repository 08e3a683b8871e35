//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, request ID)
//! - Build the gateway state from configuration
//! - Bind server to listener, stop on shutdown signal
//! - Purge expired records from the in-memory rate-limit store

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::http::handler::{gateway_handler, AppState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::proxy::{ForwardError, Forwarder};
use crate::routing::Mount;
use crate::security::{Denylist, RateLimiter};
use crate::store::{MemoryStore, RateLimitStore};

/// HTTP server for the edge gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    memory_store: Option<MemoryStore>,
}

impl HttpServer {
    /// Create a server backed by an in-memory rate-limit store.
    pub fn new(config: GatewayConfig) -> Result<Self, ForwardError> {
        let store = MemoryStore::new();
        let mut server = Self::with_store(config, Arc::new(store.clone()), Arc::new(SystemClock))?;
        server.memory_store = Some(store);
        Ok(server)
    }

    /// Create a server with an explicit store and clock.
    pub fn with_store(
        config: GatewayConfig,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ForwardError> {
        let state = AppState {
            client: Arc::new(config.client.clone()),
            denylist: Arc::new(Denylist::from_config(&config.access)),
            mount: Arc::new(Mount::new(&config.listener.mount_path)),
            limiter: RateLimiter::new(&config.rate_limit, store, clock),
            forwarder: Arc::new(Forwarder::new(&config.upstream)?),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            memory_store: None,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// The router, for driving the gateway without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.origin,
            "HTTP server starting"
        );

        if let Some(store) = self.memory_store.clone() {
            let interval = Duration::from_secs(self.config.rate_limit.window_secs.max(1));
            tokio::spawn(purge_loop(store, interval, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn purge_loop(store: MemoryStore, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                store.purge_expired();
            }
            _ = shutdown.recv() => {
                tracing::debug!("Rate-limit purge loop exiting");
                break;
            }
        }
    }
}
