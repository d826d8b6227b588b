//! Annotation requests against real subprocesses.
//!
//! The scheduler and converter are small `sh` scripts, so these only run on
//! unix.
#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use docpipe_core::config::ToolCommandConfig;
use docpipe_core::testing::fixtures;
use docpipe_server::api::{create_router, RUN_ID_HEADER};
use docpipe_server::state::AppState;

const CONVERTED: &str = r#"{"entities":[]}"#;

fn scheduler_stub(script: &str) -> ToolCommandConfig {
    fixtures::sh_command(script, &["{input}", "{raw_output}"], Some(10))
}

fn converter_stub(marker: &Path) -> ToolCommandConfig {
    let script = format!(
        "touch '{}'; test -f \"$1\" || exit 4; printf '%s' '{}' > \"$2\"",
        marker.display(),
        CONVERTED
    );
    fixtures::sh_command(&script, &["{raw_output}", "{output}"], Some(10))
}

fn router(temp: &TempDir, scheduler: ToolCommandConfig, marker: &Path) -> Router {
    let mut config = fixtures::config(&temp.path().join("buffer"), "http://127.0.0.1:1");
    let job_template = temp.path().join("ctakes.job");
    std::fs::write(&job_template, "InputFile={input}\nOutputFile={raw_output}\n").unwrap();
    config.pipeline.job_template = job_template;
    config.pipeline.scheduler = scheduler;
    config.pipeline.converter = converter_stub(marker);
    let state = AppState::from_config(config).expect("Failed to create state");
    create_router(Arc::new(state))
}

async fn annotate(router: &Router, document: &'static [u8]) -> (StatusCode, String, String) {
    let request = Request::builder()
        .method("PUT")
        .uri("/tika/ctakes")
        .body(Body::from(document))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let run_id = response
        .headers()
        .get(RUN_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, run_id, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn test_subprocess_run_returns_converted_json() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("converter-ran");
    let scheduler = scheduler_stub(
        "test \"$(wc -c < \"$1\" | tr -d ' ')\" = 10 || exit 9; printf '<annotations/>' > \"$2\"",
    );
    let router = router(&temp, scheduler, &marker);

    let (status, run_id, body) = annotate(&router, b"0123456789").await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body, CONVERTED);
    assert!(!run_id.is_empty());
    assert!(marker.exists());
}

#[tokio::test]
async fn test_failed_job_skips_converter() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("converter-ran");
    let scheduler = scheduler_stub("echo 'job rejected by scheduler' >&2; exit 1");
    let router = router(&temp, scheduler, &marker);

    let (status, _, body) = annotate(&router, b"0123456789").await;

    assert!(!status.is_success());
    assert!(body.contains("job rejected by scheduler"), "body: {}", body);
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_repeated_runs_give_identical_results() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("converter-ran");
    let scheduler = scheduler_stub("cp \"$1\" \"$2\"");
    let router = router(&temp, scheduler, &marker);

    let (first_status, first_id, first_body) = annotate(&router, b"same note").await;
    let (second_status, second_id, second_body) = annotate(&router, b"same note").await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first_body, second_body);
    assert_ne!(first_id, second_id);
}
