//! HTTP client for the extraction and annotation services.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Body, Client};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::error::UpstreamError;
use crate::artifact::{Document, DocumentStream, JSON_CONTENT_TYPE};
use crate::config::UpstreamConfig;
use crate::metrics::{UPSTREAM_DURATION, UPSTREAM_REQUESTS_TOTAL};

/// Longest upstream error body kept in [`UpstreamError::Status`].
pub const MAX_ERROR_BODY_BYTES: usize = 4096;

/// Chunks buffered between the inbound document and the upstream request.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// A relayed upstream response.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

/// Streams documents to upstream services with `PUT`.
#[derive(Debug, Clone)]
pub struct ForwardingProxy {
    client: Client,
}

impl ForwardingProxy {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Request {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Sends `document` to `target_url` and returns the upstream response.
    ///
    /// `service` only labels logs and metrics. The document's
    /// `Content-Disposition` is relayed when present.
    pub async fn forward(
        &self,
        service: &'static str,
        target_url: &str,
        document: Document,
    ) -> Result<ProxyResponse, UpstreamError> {
        let start = Instant::now();
        let result = self.send(target_url, document).await;

        UPSTREAM_DURATION
            .with_label_values(&[service])
            .observe(start.elapsed().as_secs_f64());
        UPSTREAM_REQUESTS_TOTAL
            .with_label_values(&[service, if result.is_ok() { "success" } else { "error" }])
            .inc();

        match &result {
            Ok(response) => debug!(
                service,
                url = target_url,
                status = response.status,
                bytes = response.body.len(),
                "Upstream request complete"
            ),
            Err(e) => warn!(service, url = target_url, error = %e, "Upstream request failed"),
        }

        result
    }

    async fn send(&self, url: &str, document: Document) -> Result<ProxyResponse, UpstreamError> {
        let mut request = self
            .client
            .put(url)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .body(streaming_body(document.stream));
        if let Some(disposition) = &document.content_disposition {
            request = request.header(CONTENT_DISPOSITION, disposition.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(JSON_CONTENT_TYPE)
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, e))?;

        if !status.is_success() {
            let end = body.len().min(MAX_ERROR_BODY_BYTES);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body[..end]).into_owned(),
            });
        }

        Ok(ProxyResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// Pumps the document through a channel so the request body does not need
/// the inbound stream to be `Sync`.
fn streaming_body(mut stream: DocumentStream) -> Body {
    let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(BODY_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(chunk) = stream.next().await {
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });

    Body::wrap_stream(ReceiverStream::new(rx))
}
