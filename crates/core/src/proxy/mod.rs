//! Forwarding of documents to upstream HTTP services.

mod client;
mod error;

pub use client::{ForwardingProxy, ProxyResponse, MAX_ERROR_BODY_BYTES};
pub use error::UpstreamError;
