//! Shared utilities for gateway integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, Response, StatusCode};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Barrier;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use edge_gateway::config::GatewayConfig;
use edge_gateway::store::{
    DecideFn, Decision, MemoryStore, RateLimitRecord, RateLimitStore, StoreError,
};

pub const UPSTREAM_BODY: &str = "hello from upstream";

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    /// Path and query exactly as received.
    pub target: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Mock upstream origin recording every request it receives.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockUpstream {
    /// Start on an ephemeral port.
    ///
    /// - `/redirect` answers 302 to `/final`
    /// - `/final` answers 200 `final`
    /// - anything else answers 200 [`UPSTREAM_BODY`] with a few extra headers
    pub async fn start() -> Self {
        let seen: Arc<Mutex<Vec<SeenRequest>>> = Arc::default();
        let recorder = seen.clone();

        let app = Router::new().fallback(move |request: Request<Body>| {
            let recorder = recorder.clone();
            async move {
                let (parts, body) = request.into_parts();
                let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
                let target = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_default();
                recorder.lock().unwrap().push(SeenRequest {
                    method: parts.method,
                    target: target.clone(),
                    headers: parts.headers,
                    body,
                });

                match parts.uri.path() {
                    "/redirect" => Response::builder()
                        .status(StatusCode::FOUND)
                        .header(header::LOCATION, "/final")
                        .body(Body::empty())
                        .unwrap(),
                    "/final" => Response::new(Body::from("final")),
                    _ => Response::builder()
                        .status(StatusCode::OK)
                        .header(header::CONTENT_TYPE, "text/plain")
                        .header("x-upstream", "yes")
                        .header(header::SET_COOKIE, "a=1")
                        .header(header::SET_COOKIE, "b=2")
                        .body(Body::from(UPSTREAM_BODY))
                        .unwrap(),
                }
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, seen }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

/// An address nothing is listening on.
pub async fn unreachable_origin() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Config pointing at `origin` with the given quota.
pub fn config_for(origin: &str, max_requests: u32) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.origin = origin.to_string();
    config.upstream.connect_timeout_secs = 2;
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window_secs = 60;
    config
}

/// Build a gateway request from `ip` in `region`.
pub fn request(method: Method, uri: &str, ip: &str, region: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("CF-Connecting-IP", ip)
        .header("CF-IPCountry", region)
        .body(body)
        .unwrap()
}

pub fn get(uri: &str, ip: &str) -> Request<Body> {
    request(Method::GET, uri, ip, "US", Body::empty())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Memory store that counts calls.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimitStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        record: RateLimitRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, record, ttl).await
    }

    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        decide: DecideFn<'_>,
    ) -> Result<Decision, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(key, ttl, decide).await
    }
}

/// Store whose every call fails, as if the cache were down.
pub struct FailingStore;

#[async_trait]
impl RateLimitStore for FailingStore {
    async fn get(&self, _: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Err(StoreError::Unavailable("cache offline".into()))
    }

    async fn put(&self, _: &str, _: RateLimitRecord, _: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("cache offline".into()))
    }

    async fn update(&self, _: &str, _: Duration, _: DecideFn<'_>) -> Result<Decision, StoreError> {
        Err(StoreError::Unavailable("cache offline".into()))
    }
}

/// Memory store whose first `gated` reads wait for each other after reading,
/// so concurrent best-effort checks all see the same pre-increment state.
pub struct InterleavingStore {
    pub inner: MemoryStore,
    barrier: Barrier,
    gated: AtomicUsize,
}

impl InterleavingStore {
    pub fn new(inner: MemoryStore, gated: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(gated),
            gated: AtomicUsize::new(gated),
        }
    }
}

#[async_trait]
impl RateLimitStore for InterleavingStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let record = self.inner.get(key).await?;
        let gate = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gate {
            self.barrier.wait().await;
        }
        Ok(record)
    }

    async fn put(
        &self,
        key: &str,
        record: RateLimitRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.inner.put(key, record, ttl).await
    }

    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        decide: DecideFn<'_>,
    ) -> Result<Decision, StoreError> {
        self.inner.update(key, ttl, decide).await
    }
}

/// A log event captured by [`LogCapture`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
}

/// Tracing layer collecting events for assertions.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn find(&self, message: &str) -> Option<CapturedEvent> {
        self.events().into_iter().find(|e| e.message == message)
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.insert(field.name().to_string(), format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}
