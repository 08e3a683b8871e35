//! The gateway request pipeline.
//!
//! ```text
//! IP denylist → region denylist → path resolution → rate limit → forward
//!     403            403              (404)             429        upstream | 413 | 502
//! ```
//! Every rejection is terminal and happens before any upstream contact.
//! Only the last stage talks to the upstream, exactly once.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;

use crate::config::ClientConfig;
use crate::http::request::{request_id, ClientIdentity};
use crate::http::response;
use crate::observability::logging::ACCESS_LOG;
use crate::observability::metrics;
use crate::proxy::{ForwardError, Forwarder};
use crate::routing::Mount;
use crate::security::{AccessVerdict, Denylist, RateLimiter};

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ClientConfig>,
    pub denylist: Arc<Denylist>,
    pub mount: Arc<Mount>,
    pub limiter: RateLimiter,
    pub forwarder: Arc<Forwarder>,
}

pub async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let identity = ClientIdentity::from_request(&request, &state.client);
    let request_id = request_id(&request);
    let method = request.method().as_str().to_string();

    // 1-2. Denylists
    let verdict = state.denylist.check(&identity.ip, &identity.region);
    if verdict != AccessVerdict::Allow {
        match verdict {
            AccessVerdict::DenyIp => {
                tracing::warn!(
                    target: ACCESS_LOG,
                    request_id = %request_id,
                    ip = %identity.ip,
                    "IP blocked"
                );
            }
            _ => {
                tracing::warn!(
                    target: ACCESS_LOG,
                    request_id = %request_id,
                    ip = %identity.ip,
                    region = %identity.region,
                    "Region blocked"
                );
            }
        }
        if let Some(reason) = verdict.reason() {
            metrics::record_denied(reason);
        }
        metrics::record_request(&method, 403, "denied", start);
        return response::forbidden(verdict);
    }

    // 3. Path
    let Some(path) = state.mount.resolve(request.uri().path()) else {
        tracing::debug!(
            request_id = %request_id,
            path = %request.uri().path(),
            "Path outside mount"
        );
        metrics::record_request(&method, 404, "rejected", start);
        return response::not_found();
    };

    // 4. Rate limit
    if !state.limiter.check(&identity.ip).await {
        tracing::warn!(
            target: ACCESS_LOG,
            request_id = %request_id,
            ip = %identity.ip,
            path = %path,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited();
        metrics::record_request(&method, 429, "rate_limited", start);
        return response::too_many_requests(state.limiter.window());
    }

    // 5-6. Forward
    match state.forwarder.forward(request, &path, &identity.ip).await {
        Ok(upstream) => {
            let status = upstream.status().as_u16();
            tracing::info!(
                target: ACCESS_LOG,
                request_id = %request_id,
                ip = %identity.ip,
                method = %method,
                path = %path,
                status,
                "Request proxied"
            );
            metrics::record_request(&method, status, "proxied", start);
            upstream
        }
        Err(ForwardError::RequestBody(e)) => {
            tracing::warn!(
                target: ACCESS_LOG,
                request_id = %request_id,
                ip = %identity.ip,
                path = %path,
                error = %e,
                "Request body rejected"
            );
            metrics::record_request(&method, 413, "rejected", start);
            response::payload_too_large()
        }
        Err(e) => {
            tracing::error!(
                target: ACCESS_LOG,
                request_id = %request_id,
                ip = %identity.ip,
                path = %path,
                error = %e,
                "Proxy error"
            );
            metrics::record_request(&method, 502, "proxy_error", start);
            response::bad_gateway()
        }
    }
}
