//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Route handlers that can fail
//! fatally return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::vault::VaultError;

/// Application-level error type for the gateway.
#[derive(Debug, Error)]
pub enum AppError {
    /// Vault operation failed.
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is the server's fault rather than the client's.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Vault(
                    VaultError::Database(_)
                        | VaultError::DataDir(_)
                        | VaultError::PasswordHash
                        | VaultError::TokenSigning
                )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Vault(err) => match err {
                VaultError::InvalidCredentials | VaultError::InvalidToken => {
                    StatusCode::UNAUTHORIZED
                }
                VaultError::DuplicateEmail => StatusCode::CONFLICT,
                VaultError::WeakPassword(_) | VaultError::InvalidEmail(_) => {
                    StatusCode::BAD_REQUEST
                }
                VaultError::RecordNotFound => StatusCode::NOT_FOUND,
                VaultError::Database(_)
                | VaultError::DataDir(_)
                | VaultError::PasswordHash
                | VaultError::TokenSigning => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Vault(err) => match err {
                VaultError::InvalidCredentials | VaultError::InvalidToken => {
                    "Invalid credentials".to_string()
                }
                VaultError::DuplicateEmail => {
                    "An account with this email already exists".to_string()
                }
                VaultError::WeakPassword(msg) => msg.clone(),
                VaultError::InvalidEmail(_) => "Invalid email address".to_string(),
                VaultError::RecordNotFound => "Record not found".to_string(),
                _ => "Internal server error".to_string(),
            },
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
