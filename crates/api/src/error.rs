use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use zipdesk_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `zipdesk_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => classify_core_error(core),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a core error into an HTTP status, error code, and message.
///
/// Client-caused errors carry their message through. Server-side failures
/// are logged with full detail and answered with a fixed message.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, .. } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::PathTraversal(detail) => {
            tracing::warn!(detail = %detail, "Rejected path outside project directory");
            (
                StatusCode::FORBIDDEN,
                "PATH_TRAVERSAL",
                "Access denied: path is outside the project directory".to_string(),
            )
        }
        CoreError::LimitExceeded(msg) => {
            (StatusCode::PAYLOAD_TOO_LARGE, "LIMIT_EXCEEDED", msg.clone())
        }
        CoreError::FileRead(msg) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "FILE_READ_ERROR",
            msg.clone(),
        ),
        CoreError::Extraction(_) => server_error(err, "EXTRACTION_ERROR", "Failed to upload and extract file"),
        CoreError::DirectoryRead { .. } => server_error(err, "DIRECTORY_READ_ERROR", "Failed to read directory"),
        CoreError::FileWrite(_) => server_error(err, "FILE_WRITE_ERROR", "Failed to update file content"),
        CoreError::Build(_) => server_error(err, "PACKAGE_BUILD_ERROR", "Failed to create package"),
        CoreError::Internal(_) => server_error(err, "INTERNAL_ERROR", "An internal error occurred"),
    }
}

fn server_error(
    err: &CoreError,
    code: &'static str,
    message: &str,
) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, code, "Request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, code, message.to_string())
}
