pub mod annotate;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod routes;

pub use routes::create_router;

use axum::body::Body;
use axum::http::{header::CONTENT_DISPOSITION, HeaderMap};
use docpipe_core::Document;
use futures::TryStreamExt;

/// Response header carrying the pipeline run id.
pub const RUN_ID_HEADER: &str = "x-run-id";

/// Wraps a request body as a streaming document, keeping its
/// `Content-Disposition`.
pub(crate) fn document_from_body(headers: &HeaderMap, body: Body) -> Document {
    let content_disposition = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Document::new(
        body.into_data_stream().map_err(std::io::Error::other),
        content_disposition,
    )
}
