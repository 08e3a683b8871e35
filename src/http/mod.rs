//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → request.rs (client identity)
//!     → handler.rs (denylist → path → rate limit → forward)
//!     → response.rs (gateway-generated responses)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::AppState;
pub use request::ClientIdentity;
pub use server::HttpServer;
