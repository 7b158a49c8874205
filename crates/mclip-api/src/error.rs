//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use mclip_media::{PipelineError, PipelineStage};
use mclip_storage::StorageError;

use crate::config::ApiConfig;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Publishing failed: {0}")]
    Publish(#[from] StorageError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Machine-readable code; pipeline failures report their stage.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Pipeline(e) => e.stage().as_str(),
            ApiError::Publish(_) => "publish",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(e) if e.stage() == PipelineStage::Download => StatusCode::BAD_GATEWAY,
            ApiError::Pipeline(_) | ApiError::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl ApiError {
    /// Render as `{detail, code}`. In production, 500 details are replaced
    /// with a generic message; they are still logged.
    pub fn into_response_for(self, config: &ApiConfig) -> Response {
        let status = self.status_code();
        let code = self.code();

        if status.is_server_error() {
            match &self {
                ApiError::Pipeline(e) => error!(
                    code,
                    clip = ?e.clip_index(),
                    diagnostics = e.diagnostics().unwrap_or(""),
                    "Stitch request failed: {}", e
                ),
                other => error!(code, "Request failed: {}", other),
            }
        }

        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR && config.is_production() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { detail, code })).into_response()
    }
}

/// Renders with development settings; handlers that hold the server
/// config use [`ApiError::into_response_for`].
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_for(&ApiConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mclip_media::MediaError;
    use mclip_models::RangeError;

    #[test]
    fn test_pipeline_status_mapping() {
        let invalid = ApiError::from(PipelineError::InvalidRange {
            index: 0,
            source: RangeError::EndNotAfterStart { start: 5.0, end: 3.0 },
        });
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.code(), "invalid_range");

        let download = ApiError::from(PipelineError::Download {
            index: 1,
            source: MediaError::download_failed("Failed to download video: x (HTTP 404)"),
        });
        assert_eq!(download.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(download.code(), "download");

        let manifest = ApiError::from(PipelineError::Manifest(std::io::Error::other("disk full")));
        assert_eq!(manifest.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(manifest.code(), "manifest");
    }

    async fn render(err: ApiError, environment: &str) -> (StatusCode, serde_json::Value) {
        let config = ApiConfig {
            environment: environment.to_string(),
            ..ApiConfig::default()
        };
        let response = err.into_response_for(&config);
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_production_hides_internal_details() {
        let err = ApiError::from(PipelineError::Manifest(std::io::Error::other("disk full")));
        let (status, body) = render(err, "production").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "manifest");
        assert_eq!(body["detail"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_development_shows_internal_details() {
        let err = ApiError::from(PipelineError::Manifest(std::io::Error::other("disk full")));
        let (_, body) = render(err, "development").await;

        assert!(body["detail"].as_str().unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn test_production_keeps_client_error_details() {
        let (status, body) = render(ApiError::bad_request("Invalid payload"), "production").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid payload");
    }

    #[test]
    fn test_publish_error_code() {
        let err = ApiError::from(StorageError::upload_failed("timeout"));
        assert_eq!(err.code(), "publish");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
