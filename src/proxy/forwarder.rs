//! Forwarding admitted requests to the upstream origin.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Response};
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::proxy::target::UpstreamTarget;
use crate::routing::RoutedPath;
use crate::security::headers::{forward_headers, relay_headers};

/// Errors forwarding a request upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream origin: {0}")]
    Origin(#[from] url::ParseError),

    #[error("invalid marker header: {0}")]
    Marker(String),

    #[error("failed to build upstream client: {0}")]
    Client(reqwest::Error),

    #[error("failed to read request body: {0}")]
    RequestBody(axum::Error),

    #[error("upstream request failed: {0}")]
    Transport(reqwest::Error),
}

/// Sends requests to the fixed upstream and relays the responses.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    target: UpstreamTarget,
    marker: (HeaderName, HeaderValue),
    max_body_bytes: usize,
}

impl Forwarder {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ForwardError> {
        let target = UpstreamTarget::parse(&config.origin)?;
        let marker = (
            HeaderName::try_from(config.marker_header.as_str())
                .map_err(|e| ForwardError::Marker(e.to_string()))?,
            HeaderValue::try_from(config.marker_value.as_str())
                .map_err(|e| ForwardError::Marker(e.to_string()))?,
        );

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .no_proxy()
            .build()
            .map_err(ForwardError::Client)?;

        Ok(Self {
            client,
            target,
            marker,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Upstream URL for `path` with the inbound `query`.
    pub fn target_url(&self, path: &RoutedPath, query: Option<&str>) -> Url {
        self.target.url_for(path, query)
    }

    /// Forward `request` to `path` on the upstream, on behalf of `client_ip`.
    ///
    /// Redirects are followed by the client; the response returned is the
    /// final one, with hop-by-hop headers removed and the marker added.
    pub async fn forward(
        &self,
        request: Request<Body>,
        path: &RoutedPath,
        client_ip: &str,
    ) -> Result<Response<Body>, ForwardError> {
        let url = self.target_url(path, request.uri().query());
        let (parts, body) = request.into_parts();
        let headers = forward_headers(&parts.headers, client_ip);

        // Buffered so 307/308 redirects can resend it.
        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(ForwardError::RequestBody)?;

        tracing::debug!(method = %parts.method, url = %url, "Forwarding upstream");

        let mut outbound = self.client.request(parts.method, url).headers(headers);
        if !body.is_empty() {
            outbound = outbound.body(body);
        }
        let upstream = outbound.send().await.map_err(ForwardError::Transport)?;

        let status = upstream.status();
        let headers = relay_headers(upstream.headers(), &self.marker);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
