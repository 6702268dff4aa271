//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! failure is rendered as an HTTP response.

use crate::config::ConfigError;
use crate::web::rest::MessageResponse;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use qa_engine_core::ports::PortError;
use tracing::{error, warn};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the engine or a port.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing, invalid or expired session token, or a token for someone else.
    #[error("{0}")]
    Unauthenticated(String),

    /// Malformed payload, cookie or query.
    #[error("{0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Error parsing data provided: {}", rejection.body_text()))
    }
}

impl ApiError {
    /// The normalized status code and the message that is safe to show a client.
    fn status_and_message(&self) -> (StatusCode, String) {
        const INTERNAL: &str = "Internal server error";
        match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Port(port) => match port {
                PortError::UserNotFound | PortError::QuestionNotFound => {
                    (StatusCode::NOT_FOUND, port.to_string())
                }
                PortError::DuplicateVote(_) | PortError::Conflict(_) => {
                    (StatusCode::CONFLICT, port.to_string())
                }
                PortError::Unavailable => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                ),
                PortError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
            },
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
        }
        (status, Json(MessageResponse::failure(message))).into_response()
    }
}
