//! Responses the gateway produces itself.
//!
//! Everything else is the upstream response relayed by the forwarder.

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::security::AccessVerdict;

pub const TOO_MANY_REQUESTS_BODY: &str = "Too Many Requests";
pub const BAD_GATEWAY_BODY: &str = "Bad Gateway";

/// 403 naming the denylist that matched.
pub fn forbidden(verdict: AccessVerdict) -> Response {
    let body = verdict.rejection_body().unwrap_or("Access denied");
    (StatusCode::FORBIDDEN, body).into_response()
}

/// 429 with `Retry-After` set to the window length in seconds.
pub fn too_many_requests(window: Duration) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, window.as_secs().to_string())],
        TOO_MANY_REQUESTS_BODY,
    )
        .into_response()
}

pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, BAD_GATEWAY_BODY).into_response()
}

pub fn payload_too_large() -> Response {
    (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response()
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
