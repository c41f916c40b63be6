use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Message shared by unknown, consumed and expired download tokens.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Directory unavailable: {0}")]
    IoUnavailable(#[source] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Reported to callers exactly like an unknown token.
    #[error("Token expired")]
    Expired,

    #[error("{message}; output: {output}")]
    ExternalFailure { message: String, output: String },

    #[error("Randomness source failed: {0}")]
    RandomnessFailure(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            // OS detail goes to the log only.
            AppError::IoUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Client storage unavailable".into(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Expired => (StatusCode::NOT_FOUND, INVALID_TOKEN_MESSAGE.into(), None),
            AppError::ExternalFailure { message, output } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                message.clone(),
                Some(output.clone()),
            ),
            AppError::RandomnessFailure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not generate download token".into(),
                None,
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".into(), None),
            AppError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg.clone(), None),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self);
        } else {
            tracing::debug!(status = %status, error = %message);
        }

        let mut error = json!({
            "code": status.as_u16(),
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = json!(details);
        }

        let body = json!({
            "data": null,
            "error": error,
        });

        (status, axum::Json(body)).into_response()
    }
}
