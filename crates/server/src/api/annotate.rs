//! Annotation pipeline handler.

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::ApiError;
use super::{document_from_body, RUN_ID_HEADER};
use crate::state::AppState;

/// PUT {base_path}/ctakes
///
/// Runs the document through the annotation pipeline and returns the
/// converted JSON. When `pipeline.cancel_on_disconnect` is off, the run
/// continues to completion even if the client goes away.
pub async fn annotate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let document = document_from_body(&headers, body);
    let pipeline = Arc::clone(state.pipeline());

    let result = if state.config().pipeline.cancel_on_disconnect {
        pipeline.run(document).await
    } else {
        tokio::spawn(async move { pipeline.run(document).await })
            .await
            .map_err(|e| ApiError::Internal(format!("Pipeline task failed: {}", e)))?
    };
    let output = result?;

    let mut response = (
        [(CONTENT_TYPE, output.payload.content_type)],
        output.payload.bytes,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&output.run_id) {
        response.headers_mut().insert(RUN_ID_HEADER, value);
    }
    Ok(response)
}
