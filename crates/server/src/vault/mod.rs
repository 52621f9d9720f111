//! The embedded record vault.
//!
//! Owns auth records, password hashing, and the auth-token lifecycle. The web
//! layer talks to the vault through this surface only and never touches the
//! storage file, password hashes, or signing keys directly.
//!
//! Persistence lives in a single SQLite file under the configured data
//! directory; passwords are hashed with Argon2id; tokens are HS256 JWTs.

mod error;
mod store;
mod token;

pub use error::VaultError;
pub use token::AUTH_TOKEN_TTL_HOURS;

use std::path::Path;
use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use tidegate_core::{Email, RecordId};

use store::RecordStore;
use token::TokenSigner;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// An auth record as exposed to the web layer.
///
/// The password hash stays inside the vault; this is also the shape the JSON
/// API serializes for clients.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRecord {
    /// Opaque record ID.
    pub id: RecordId,
    /// The record's email address.
    pub email: Email,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Handle to the embedded vault.
///
/// Cheaply cloneable; all state lives behind an `Arc`.
#[derive(Clone)]
pub struct Vault {
    inner: Arc<VaultInner>,
}

struct VaultInner {
    store: RecordStore,
    signer: TokenSigner,
}

impl Vault {
    /// Open the vault in the given data directory, creating the directory
    /// and the data file on first run.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::DataDir` if the directory cannot be created and
    /// `VaultError::Database` if the store cannot be opened.
    pub async fn open(data_dir: &Path, token_secret: &SecretString) -> Result<Self, VaultError> {
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("data.db");
        if !db_path.exists() {
            tracing::info!(
                "fresh installation detected, initializing vault at {}",
                db_path.display()
            );
        }

        let store = RecordStore::connect(&db_path).await?;

        Ok(Self::assemble(store, TokenSigner::new(token_secret)))
    }

    /// Open an in-memory vault (tests).
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Database` if the in-memory store cannot be opened.
    pub async fn open_in_memory(token_secret: &SecretString) -> Result<Self, VaultError> {
        let store = RecordStore::connect_in_memory().await?;
        Ok(Self::assemble(store, TokenSigner::new(token_secret)))
    }

    fn assemble(store: RecordStore, signer: TokenSigner) -> Self {
        Self {
            inner: Arc::new(VaultInner { store, signer }),
        }
    }

    /// Check storage connectivity (readiness probes).
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Database` if the store is unreachable.
    pub async fn ping(&self) -> Result<(), VaultError> {
        self.inner.store.ping().await
    }

    /// Find an auth record by email.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidEmail` if the email does not parse and
    /// `VaultError::Database` if the lookup fails.
    pub async fn find_record_by_email(&self, email: &str) -> Result<Option<AuthRecord>, VaultError> {
        let email = Email::parse(email)?;
        self.inner.store.find_by_email(&email).await
    }

    /// Check credentials and return the matching record.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidCredentials` for an unknown email, an
    /// unparseable email, or a wrong password - callers cannot tell which.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthRecord, VaultError> {
        let email = Email::parse(email).map_err(|_| VaultError::InvalidCredentials)?;

        let (record, password_hash) = self
            .inner
            .store
            .find_by_email_with_hash(&email)
            .await?
            .ok_or(VaultError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(record)
    }

    /// Create a new auth record.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidEmail` if the email does not parse,
    /// `VaultError::WeakPassword` if the password fails validation, and
    /// `VaultError::DuplicateEmail` if the email is already registered.
    pub async fn create_record(&self, email: &str, password: &str) -> Result<AuthRecord, VaultError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        self.inner.store.create(&email, &password_hash).await
    }

    /// Replace a record's password.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::WeakPassword` if the new password fails
    /// validation and `VaultError::RecordNotFound` if the record is gone.
    pub async fn set_password(&self, id: RecordId, password: &str) -> Result<(), VaultError> {
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        self.inner.store.update_password(id, &password_hash).await
    }

    /// Mint a fresh auth token for a record.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::TokenSigning` if the token cannot be signed.
    pub fn mint_auth_token(&self, record: &AuthRecord) -> Result<String, VaultError> {
        self.inner.signer.mint(record.id)
    }

    /// Resolve an auth token to its record.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidToken` for a bad or expired token, or one
    /// whose record no longer exists.
    pub async fn find_record_by_token(&self, auth_token: &str) -> Result<AuthRecord, VaultError> {
        let id = self.inner.signer.verify(auth_token)?;

        self.inner
            .store
            .find_by_id(id)
            .await?
            .ok_or(VaultError::InvalidToken)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), VaultError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(VaultError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, VaultError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| VaultError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), VaultError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| VaultError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| VaultError::InvalidCredentials)
}
