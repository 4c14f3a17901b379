use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use scriptd_core::error::CoreError;
use scriptd_core::scripting::error::ScriptError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`ScriptError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `scriptd_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A script lifecycle error from the orchestrator.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }

            // --- ScriptError variants ---
            AppError::Script(err) => match err {
                ScriptError::EmptyCommand => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
                }
                ScriptError::NoSuchScript(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                ScriptError::NoSuchRunningScript(_) => {
                    (StatusCode::CONFLICT, "NOT_RUNNING", err.to_string())
                }
                ScriptError::StartFailure(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "START_FAILED",
                    err.to_string(),
                ),
                ScriptError::Store(store) => {
                    tracing::error!(error = %store, "Script store error");
                    internal()
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
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
