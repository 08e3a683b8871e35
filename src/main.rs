//! Edge Gateway
//!
//! A single-origin reverse proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────────┐
//!                         │                      EDGE GATEWAY                         │
//!                         │                                                           │
//!     Client Request      │  ┌──────────┐   ┌───────────┐   ┌────────┐   ┌─────────┐ │
//!     ────────────────────┼─▶│  http    │──▶│ security  │──▶│routing │──▶│security │ │
//!                         │  │ server   │   │ denylists │   │ mount  │   │rate     │ │
//!                         │  └──────────┘   └─────┬─────┘   └────────┘   │limit    │ │
//!                         │                  403  │                      └────┬────┘ │
//!                         │                       ▼                      429  │      │
//!     Client Response     │  ┌──────────┐   ┌───────────┐                     │      │
//!     ◀───────────────────┼──│ response │◀──│  proxy    │◀────────────────────┘      │
//!                         │  │ + marker │   │ forwarder │◀──────────────────────────┼──── Upstream
//!                         │  └──────────┘   └───────────┘   502 on failure          │     Origin
//!                         │                                                           │
//!                         │  ┌──────────┐   ┌───────────┐   ┌───────────────────────┐ │
//!                         │  │  config  │   │   store   │   │ observability         │ │
//!                         │  │  (TOML)  │   │ mem/redis │   │ tracing + prometheus  │ │
//!                         │  └──────────┘   └───────────┘   └───────────────────────┘ │
//!                         └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config::{load_config, GatewayConfig};
use edge_gateway::lifecycle::{signals, startup, Shutdown};

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(
    about = "Edge gateway: denylists, rate limiting, single-origin reverse proxy",
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    startup::init_observability(&config)?;

    tracing::info!("edge-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        blocked_ips = config.access.blocked_ips.len(),
        blocked_regions = config.access.blocked_regions.len(),
        "Configuration loaded"
    );

    let server = startup::build_server(config).await?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
