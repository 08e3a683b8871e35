//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway pipeline produces:
//!     → logging.rs (structured log events, access target)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID set at the edge of the router and forwarded upstream
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
