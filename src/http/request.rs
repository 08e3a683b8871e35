//! Request inspection.
//!
//! # Responsibilities
//! - Extract client IP and region from trusted edge headers
//! - Request ID generation (UUID v4) and propagation
//!
//! # Design Decisions
//! - Identity headers are trusted; spoofing is handled by the edge in front
//! - Missing or empty values become `unknown`
//! - Request ID added as early as possible for tracing, and forwarded upstream

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

use crate::config::ClientConfig;

/// Value used when an identity attribute is not available.
pub const UNKNOWN: &str = "unknown";

/// Who the request claims to come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub ip: String,
    pub region: String,
}

impl ClientIdentity {
    pub fn from_request<B>(request: &Request<B>, config: &ClientConfig) -> Self {
        let headers = request.headers();
        let ip = header_value(headers, &config.ip_header)
            .or_else(|| {
                if config.peer_fallback {
                    request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string())
                } else {
                    None
                }
            })
            .unwrap_or_else(|| UNKNOWN.to_string());
        let region =
            header_value(headers, &config.region_header).unwrap_or_else(|| UNKNOWN.to_string());

        Self { ip, region }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The request ID assigned by [`set_request_id_layer`], or `unknown`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Layer that sets `x-request-id` on requests lacking one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that copies `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
