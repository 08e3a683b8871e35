//! Edge gateway library: denylists, fixed-window rate limiting, and a
//! single-origin reverse proxy.

pub mod clock;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;
pub mod store;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
