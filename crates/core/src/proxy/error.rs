//! Error types for the proxy module.

use thiserror::Error;

/// Errors from forwarding a document upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream service could not be reached.
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The upstream service did not answer in time.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The upstream service answered with a non-success status.
    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Any other transport failure.
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

impl UpstreamError {
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if e.is_connect() {
            Self::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else {
            Self::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
