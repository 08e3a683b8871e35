//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! admitted request + RoutedPath + client ip
//!     → target.rs (origin with path replaced, query copied)
//!     → security::headers (outbound header map)
//!     → forwarder.rs (send, follow redirects, relay)
//!     → response with marker header | ForwardError
//! ```
//!
//! # Design Decisions
//! - Single fixed origin, no load balancing
//! - Redirects are followed here, never relayed
//! - No retries: a transport failure is final

pub mod forwarder;
pub mod target;

pub use forwarder::{ForwardError, Forwarder};
pub use target::UpstreamTarget;
