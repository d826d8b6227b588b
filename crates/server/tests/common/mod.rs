//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock scheduler and converter injected, plus a stub upstream
//! service on a local port standing in for the extraction service.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::put;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::ServiceExt;

use docpipe_core::testing::{MockConverter, MockScheduler};
use docpipe_core::{AnnotationPipeline, Config, ForwardingProxy};
use docpipe_server::state::AppState;

/// Re-export fixtures for test convenience
pub use docpipe_core::testing::fixtures;

/// A request as seen by the stub upstream.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub body: Bytes,
    pub content_disposition: Option<String>,
}

/// A local HTTP server standing in for the extraction service.
///
/// - `PUT /rmeta` answers `{"title":"x"}`
/// - `PUT /reject` answers 422
/// - `PUT /slow` answers after 3 seconds
pub struct StubUpstream {
    pub addr: SocketAddr,
    pub received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl StubUpstream {
    pub async fn start() -> Self {
        let received: Arc<Mutex<Vec<ReceivedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/rmeta", put(stub_rmeta))
            .route(
                "/reject",
                put(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "unsupported media") }),
            )
            .route(
                "/slow",
                put(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    "late"
                }),
            )
            .with_state(Arc::clone(&received));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, received }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().await.clone()
    }
}

async fn stub_rmeta(
    State(received): State<Arc<Mutex<Vec<ReceivedRequest>>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    received.lock().await.push(ReceivedRequest {
        path: "/rmeta".to_string(),
        body,
        content_disposition: headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    ([(CONTENT_TYPE, "application/json")], r#"{"title":"x"}"#)
}

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_annotate() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.put("/tika/ctakes", b"note".to_vec()).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub state: Arc<AppState>,
    /// Mock scheduler - control job outcomes
    pub scheduler: Arc<MockScheduler>,
    /// Mock converter - control converted output
    pub converter: Arc<MockConverter>,
    pub upstream: StubUpstream,
    /// Buffer directory for run artifacts
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
    pub body: Value,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test fixture after adjusting the generated configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let upstream = StubUpstream::start().await;

        let mut config = fixtures::config(temp_dir.path(), &upstream.base_url());
        adjust(&mut config);

        let scheduler = Arc::new(MockScheduler::new());
        let converter = Arc::new(MockConverter::new());
        let pipeline = AnnotationPipeline::new(
            config.pipeline.clone(),
            scheduler.clone(),
            converter.clone(),
        )
        .with_max_document_bytes(config.server.max_document_bytes);

        let proxy = ForwardingProxy::new(&config.upstream).expect("Failed to create proxy");
        let state = Arc::new(AppState::new(config, Arc::new(pipeline), proxy));
        let router = docpipe_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            scheduler,
            converter,
            upstream,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a PUT request with a raw document body.
    pub async fn put(&self, path: &str, body: impl Into<Body>) -> TestResponse {
        let request = Request::builder()
            .method("PUT")
            .uri(path)
            .header("content-type", "application/octet-stream")
            .body(body.into())
            .unwrap();
        self.send(request).await
    }

    /// Send a prepared request to the test server.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// Builds a `multipart/form-data` body from `(name, filename, content)` parts.
pub fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status,
            $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            $response.text()
        );
    };
}
