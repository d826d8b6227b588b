//! Mapping of pipeline and upstream failures to HTTP responses.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use docpipe_core::{PipelineError, UpstreamError};

use super::RUN_ID_HEADER;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

impl ErrorResponse {
    fn new(kind: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.to_string(),
            stage: None,
            run_id: None,
            exit_code: None,
            stdout: None,
            stderr: None,
            upstream_status: None,
        }
    }
}

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    Upstream(UpstreamError),
    BadRequest(String),
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self::Pipeline(e)
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        Self::Upstream(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Pipeline(e) if e.is_too_large() => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::Pipeline(e) => ErrorResponse {
                stage: Some(e.stage().as_str().to_string()),
                run_id: Some(e.run_id().to_string()),
                exit_code: e.exit_code(),
                stdout: e.stdout().map(str::to_string),
                stderr: e.stderr().map(str::to_string),
                ..ErrorResponse::new(e.kind(), e.to_string())
            },
            Self::Upstream(e) => ErrorResponse {
                upstream_status: match e {
                    UpstreamError::Status { status, .. } => Some(*status),
                    _ => None,
                },
                ..ErrorResponse::new("upstream", e.to_string())
            },
            Self::BadRequest(message) => ErrorResponse::new("bad_request", message.clone()),
            Self::Internal(message) => ErrorResponse::new("internal", message.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if let Self::Pipeline(e) = &self {
            if let Ok(value) = HeaderValue::from_str(e.run_id()) {
                response.headers_mut().insert(RUN_ID_HEADER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_core::artifact::StagingError;

    #[test]
    fn test_upstream_status_codes() {
        let timeout = ApiError::Upstream(UpstreamError::Timeout {
            url: "http://x".to_string(),
        });
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let refused = ApiError::Upstream(UpstreamError::Connect {
            url: "http://x".to_string(),
            reason: "refused".to_string(),
        });
        assert_eq!(refused.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(refused.body().kind, "upstream");
    }

    #[test]
    fn test_too_large_is_413() {
        let err = ApiError::Pipeline(PipelineError::Staging {
            run_id: "run-1".to_string(),
            source: StagingError::TooLarge { limit: 10 },
        });
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = err.into_response();
        assert_eq!(response.headers()[RUN_ID_HEADER], "run-1");
    }

    #[test]
    fn test_body_omits_missing_fields() {
        let json = serde_json::to_value(ErrorResponse::new("bad_request", "no file")).unwrap();
        assert_eq!(json["error"], "no file");
        assert!(json.get("stage").is_none());
        assert!(json.get("stderr").is_none());
    }
}
