//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (IP denylist, then region denylist)
//!     → rate_limit.rs (per-IP fixed window)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Pass to forwarding
//! ```
//!
//! # Design Decisions
//! - Denylists fail closed: a match always rejects
//! - Rate limiting fails open: a store outage never rejects
//! - Client identity headers are trusted as set by the edge

pub mod access_control;
pub mod headers;
pub mod rate_limit;

pub use access_control::{AccessVerdict, Denylist};
pub use rate_limit::RateLimiter;
