//! Vault error types.

use thiserror::Error;

/// Errors that can occur inside the record vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tidegate_core::EmailError),

    /// Invalid credentials (wrong password or record not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Auth record not found.
    #[error("record not found")]
    RecordNotFound,

    /// A record with this email already exists.
    #[error("a record with this email already exists")]
    DuplicateEmail,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Auth token failed verification or has expired.
    #[error("invalid or expired auth token")]
    InvalidToken,

    /// Auth token could not be signed.
    #[error("token signing error")]
    TokenSigning,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Data directory could not be prepared.
    #[error("data directory error: {0}")]
    DataDir(#[from] std::io::Error),

    /// Storage error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
