//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (already allow-listed by the outer router)
//!     → path.rs (strip mount prefix, split into segments)
//!     → RoutedPath ("/" + segments joined by "/")
//! ```
//!
//! # Design Decisions
//! - No allow-listing here; only permitted paths reach the gateway
//! - Segments keep their percent-encoding, nothing is decoded

pub mod path;

pub use path::{Mount, RoutedPath};
