use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ragbridge_core::error::CoreError;
use ragbridge_upstream::UpstreamApiError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `ragbridge_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The job runner answered with a non-success status.
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// An internal error with a human-readable message (logged, never
    /// returned to the caller).
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<UpstreamApiError> for AppError {
    fn from(err: UpstreamApiError) -> Self {
        match err {
            UpstreamApiError::ApiError { status, body } => AppError::Upstream { status, body },
            UpstreamApiError::Request(e) => AppError::InternalError(format!("Upstream request failed: {e}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Upstream { status, body } => {
                tracing::warn!(status, body = %body, "Upstream returned an error");
                (
                    upstream_status(*status),
                    "UPSTREAM_ERROR",
                    format!("Upstream error ({status}): {body}"),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Map the job runner's status onto ours. Anything that is not an error
/// status on the wire (or not a valid code) becomes 502.
fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}
