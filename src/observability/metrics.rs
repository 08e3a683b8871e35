//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, outcome
//! - `gateway_request_duration_seconds` (histogram): latency by outcome
//! - `gateway_denied_total` (counter): denylist hits by reason
//! - `gateway_rate_limited_total` (counter): 429s issued
//! - `gateway_store_errors_total` (counter): failed store calls by operation
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a finished request. `outcome` is one of `denied`, `rate_limited`,
/// `proxied`, `proxy_error`, `rejected`.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_denied(reason: &'static str) {
    counter!("gateway_denied_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_store_error(op: &'static str) {
    counter!("gateway_store_errors_total", "op" => op).increment(1);
}
