//! Auth-token lifecycle.
//!
//! Tokens are HS256 JWTs carrying the record ID; the signing secret never
//! leaves the vault. Verification enforces the expiry claim, so a stolen
//! cookie goes stale on its own.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use tidegate_core::RecordId;

use super::error::VaultError;

/// Lifetime of a minted auth token, in hours. The session cookie carrying
/// the token uses the same value for its Max-Age.
pub const AUTH_TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims carried by an auth token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Record ID the token was minted for.
    sub: String,
    /// Issued at (unix seconds).
    iat: i64,
    /// Expiration (unix seconds).
    exp: i64,
}

/// Signs and verifies auth tokens with the vault's secret.
pub(crate) struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub(crate) fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Mint a fresh auth token for a record.
    pub(crate) fn mint(&self, record_id: RecordId) -> Result<String, VaultError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: record_id.to_string(),
            iat: now,
            exp: now + AUTH_TOKEN_TTL_HOURS * 60 * 60,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|_| VaultError::TokenSigning)
    }

    /// Verify a token and return the record ID it was minted for.
    ///
    /// Any failure (bad signature, malformed token, expired) collapses to
    /// `InvalidToken`; callers get no detail to relay.
    pub(crate) fn verify(&self, token: &str) -> Result<RecordId, VaultError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| VaultError::InvalidToken)?;

        RecordId::parse(&data.claims.sub).map_err(|_| VaultError::InvalidToken)
    }
}
