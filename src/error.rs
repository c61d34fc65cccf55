//! Error handling for camwatch

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Camera hardware errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum CameraError {
    /// Device could not be opened, or is not open
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    /// Transient read miss; caller should back off and retry
    #[error("Camera read failed: {0}")]
    ReadFailed(String),
}

/// Analysis service errors
///
/// These never propagate out of the pipeline; they are classified into
/// response text so every capture yields a displayable record.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    /// Request exceeded the configured deadline
    #[error("Analysis request timed out")]
    Timeout,

    /// Could not reach the analysis service
    #[error("Could not connect to analysis service: {0}")]
    ConnectionFailed(String),

    /// Response was missing the expected `response` field
    #[error("Invalid response format: {0}")]
    MalformedResponse(String),

    /// Non-success HTTP status from the service
    #[error("Analysis service returned HTTP {0}")]
    HttpError(u16),
}

/// Scheduler errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulerError {
    /// start() while already running; benign no-op
    #[error("Scheduler already running")]
    AlreadyRunning,
}

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera error
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// Analysis error
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Scheduler error
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::Camera(CameraError::Unavailable(msg)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CAMERA_UNAVAILABLE",
                msg.clone(),
            ),
            Error::Camera(CameraError::ReadFailed(msg)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CAMERA_READ_FAILED",
                msg.clone(),
            ),
            Error::Analysis(e) => (StatusCode::BAD_GATEWAY, "ANALYSIS_ERROR", e.to_string()),
            Error::Scheduler(e) => (StatusCode::CONFLICT, "SCHEDULER_ERROR", e.to_string()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            Error::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERIALIZATION_ERROR",
                e.to_string(),
            ),
            Error::Http(e) => (StatusCode::BAD_GATEWAY, "HTTP_ERROR", e.to_string()),
            Error::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", e.to_string()),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
