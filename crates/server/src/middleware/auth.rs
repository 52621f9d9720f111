//! Session bridge: cookie-to-record resolution and cookie builders.
//!
//! The `pb_auth` cookie carries a vault-minted bearer token and is the only
//! session state. Every protected request resolves it against the vault; no
//! verification result is cached between requests.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::models::{CurrentUser, cookies};
use crate::state::AppState;
use crate::vault::AUTH_TOKEN_TTL_HOURS;

/// Lifetime of the reset cookie pair, in hours.
const RESET_COOKIE_TTL_HOURS: i64 = 1;

/// Extractor that requires an authenticated session.
///
/// If the session cookie is absent or does not resolve to a record, the
/// request is rejected: page routes get a redirect to the login page, `/api/`
/// routes get a 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but missing.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Pick the rejection style for a request path.
fn rejection_for(path: &str) -> AuthRejection {
    if path.starts_with("/api/") {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectToLogin
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_owned();

        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(cookies::PB_AUTH)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| rejection_for(&path))?;

        // Full token-verification round trip on every request; the cookie is
        // the only session state there is.
        let record = state
            .vault()
            .find_record_by_token(&token)
            .await
            .map_err(|_| rejection_for(&path))?;

        Ok(Self(CurrentUser {
            id: record.id,
            email: record.email,
        }))
    }
}

// =============================================================================
// Cookie builders
// =============================================================================

/// Build the session cookie carrying a freshly minted auth token.
#[must_use]
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((cookies::PB_AUTH, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(AUTH_TOKEN_TTL_HOURS))
        .build()
}

/// Build a removal cookie for the session cookie. Safe to send whether or
/// not a session existed.
#[must_use]
pub fn clear_session_cookie() -> Cookie<'static> {
    removal_cookie(cookies::PB_AUTH)
}

/// Build the short-lived reset-token cookie.
#[must_use]
pub fn reset_token_cookie(token: String) -> Cookie<'static> {
    short_lived_cookie(cookies::RESET_TOKEN, token)
}

/// Build the short-lived reset-email cookie.
#[must_use]
pub fn reset_email_cookie(email: String) -> Cookie<'static> {
    short_lived_cookie(cookies::RESET_EMAIL, email)
}

/// Clear both reset cookies.
#[must_use]
pub fn clear_reset_cookies(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(cookies::RESET_TOKEN))
        .add(removal_cookie(cookies::RESET_EMAIL))
}

fn short_lived_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(RESET_COOKIE_TTL_HOURS))
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build()
}
