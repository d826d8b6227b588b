use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{annotate, handlers, middleware::metrics_middleware, proxy};
use crate::state::AppState;

/// Multipart framing allowance on top of the document size limit.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let base_path = state.config().server.base_path.clone();
    let form_limit = usize::try_from(state.config().server.max_document_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    // Document routes, rooted at the configured base path
    let document_routes = Router::new()
        .route("/status", get(handlers::status_page))
        .route("/rmeta", put(proxy::extract))
        .route(
            "/rmeta/form",
            put(proxy::extract_form).layer(DefaultBodyLimit::max(form_limit)),
        )
        .route("/ctakes", put(annotate::annotate))
        .with_state(Arc::clone(&state));

    // Operational routes
    let ops_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/pipeline/status", get(handlers::pipeline_status))
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    Router::new()
        .nest(&base_path, document_routes)
        .merge(ops_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
