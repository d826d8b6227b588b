//! Extraction proxy handlers.

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::sync::Arc;
use docpipe_core::{Document, ProxyResponse};
use tracing::debug;

use super::document_from_body;
use super::error::ApiError;
use crate::state::AppState;

const EXTRACTION_SERVICE: &str = "extraction";

/// PUT {base_path}/rmeta
///
/// Streams the request body to the extraction service.
pub async fn extract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let document = document_from_body(&headers, body);
    let response = state
        .proxy()
        .forward(
            EXTRACTION_SERVICE,
            &state.config().upstream.extraction_url,
            document,
        )
        .await?;
    Ok(relay(response))
}

/// PUT {base_path}/rmeta/form
///
/// Takes the uploaded file out of a multipart form and forwards it. The part
/// named `file` wins, then the first part with a filename, then the first part.
pub async fn extract_form(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut chosen: Option<FormFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(ApiError::BadRequest(format!("Malformed form: {}", e))),
        };

        let is_file_field = field.name() == Some("file");
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read form part: {}", e)))?;
        let candidate = FormFile { filename, bytes };

        if is_file_field {
            chosen = Some(candidate);
            break;
        }
        chosen = match chosen {
            None => Some(candidate),
            Some(current) if current.filename.is_none() && candidate.filename.is_some() => {
                Some(candidate)
            }
            keep => keep,
        };
    }

    let file = chosen.ok_or_else(|| ApiError::BadRequest("No file part in form".to_string()))?;
    debug!(
        filename = ?file.filename,
        bytes = file.bytes.len(),
        "Forwarding form upload"
    );

    let mut document = Document::from_bytes(file.bytes);
    if let Some(filename) = &file.filename {
        document = document.with_content_disposition(format!(
            "attachment; filename=\"{}\"",
            filename.replace('"', "")
        ));
    }

    let response = state
        .proxy()
        .forward(
            EXTRACTION_SERVICE,
            &state.config().upstream.extraction_url,
            document,
        )
        .await?;
    Ok(relay(response))
}

struct FormFile {
    filename: Option<String>,
    bytes: Bytes,
}

/// Relays an upstream response body and content type unchanged.
fn relay(response: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    (status, [(CONTENT_TYPE, response.content_type)], response.body).into_response()
}
