use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use docpipe_core::PipelineStatus;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET {base_path}/status
///
/// Human-readable page naming the upstream services.
pub async fn status_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let config = state.config();
    let base = &config.server.base_path;
    let extraction = escape_html(&config.upstream.extraction_url);
    let annotation = escape_html(&config.upstream.annotation_url);

    Html(format!(
        "<h1>Document pipeline: running correctly</h1>\
         <h2>Extraction proxy: {base}/rmeta</h2><p>{extraction}</p>\
         <h2>Annotation pipeline: {base}/ctakes</h2><p>{annotation}</p>\
         <h2>Extraction form proxy: {base}/rmeta/form</h2><p>{extraction}</p>",
        base = escape_html(base),
    ))
}

/// GET /pipeline/status
pub async fn pipeline_status(State(state): State<Arc<AppState>>) -> Json<PipelineStatus> {
    Json(state.pipeline().status())
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
