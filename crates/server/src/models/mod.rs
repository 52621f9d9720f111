//! Request-scoped models.

use serde::{Deserialize, Serialize};

use tidegate_core::{Email, RecordId};

/// The authenticated user resolved from the session cookie.
///
/// Lives for the duration of a single request only; nothing is cached
/// between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Record ID in the vault.
    pub id: RecordId,
    /// User's email address.
    pub email: Email,
}

/// Cookie names used by the auth flows.
pub mod cookies {
    /// Session bearer token minted by the vault.
    pub const PB_AUTH: &str = "pb_auth";

    /// Password-reset token bound to the issuing browser.
    pub const RESET_TOKEN: &str = "reset_token";

    /// Email the pending password reset was issued for.
    pub const RESET_EMAIL: &str = "reset_email";
}
