//! Header manipulation for forwarded requests and relayed responses.
//!
//! # Responsibilities
//! - Set X-Forwarded-For, X-Real-IP, X-Forwarded-Proto
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - Outbound headers are a fresh map built from the inbound ones; the
//!   inbound request is never mutated
//! - Forwarding headers overwrite whatever the client sent
//! - `Host` is dropped so the client derives it from the upstream URL

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// True for headers that describe a single connection rather than the message.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Header names listed in `Connection`, which are hop-by-hop for this message.
fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}

fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let listed = connection_listed(headers);
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || listed.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Build the header map sent upstream for a request from `client_ip`.
pub fn forward_headers(inbound: &HeaderMap, client_ip: &str) -> HeaderMap {
    let mut out = end_to_end(inbound);
    out.remove(header::HOST);

    match HeaderValue::from_str(client_ip) {
        Ok(ip) => {
            out.insert(X_FORWARDED_FOR, ip.clone());
            out.insert(X_REAL_IP, ip);
        }
        Err(_) => {
            tracing::debug!(client_ip = %client_ip, "Client IP is not a valid header value");
            out.remove(X_FORWARDED_FOR);
            out.remove(X_REAL_IP);
        }
    }
    out.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https"));
    out
}

/// Build the header map relayed to the client from an upstream response.
pub fn relay_headers(upstream: &HeaderMap, marker: &(HeaderName, HeaderValue)) -> HeaderMap {
    let mut out = end_to_end(upstream);
    out.insert(marker.0.clone(), marker.1.clone());
    out
}
