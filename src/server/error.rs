use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for the support-messaging core. None of these are fatal
/// to the application; each degrades a single widget or request.
#[derive(Debug, Error)]
pub enum SupportError {
    #[error("invalid or expired guest credential")]
    InvalidCredential,

    #[error("message content must not be empty")]
    EmptyMessage,

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("identity not found")]
    UnknownIdentity,

    #[error("sender and receiver must differ")]
    SelfAddressed,

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl IntoResponse for SupportError {
    fn into_response(self) -> Response {
        let status = match &self {
            SupportError::InvalidCredential | SupportError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            SupportError::EmptyMessage => StatusCode::BAD_REQUEST,
            SupportError::SelfAddressed => StatusCode::UNPROCESSABLE_ENTITY,
            SupportError::UnknownIdentity => StatusCode::NOT_FOUND,
            SupportError::Storage(e) => {
                error!("storage failure: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
