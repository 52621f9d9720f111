//! Authentication route handlers.
//!
//! Handles login, registration, logout, and the password-reset flow against
//! the embedded record vault. Validation failures re-render the originating
//! form; only vault/storage failures bubble up as `AppError`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, TimeZone, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::Deserialize;

use crate::error::AppError;
use crate::filters;
use crate::middleware::{
    clear_reset_cookies, clear_session_cookie, reset_email_cookie, reset_token_cookie,
    session_cookie,
};
use crate::models::cookies;
use crate::state::AppState;
use crate::vault::VaultError;

/// Shown for any credential failure so the form never reveals which field
/// was wrong.
const GENERIC_LOGIN_ERROR: &str =
    "Invalid email or password. If you forgot your password, use the 'Forgot Password' link below.";

/// Shown for every forgot-password submission, whether or not the account
/// exists.
const GENERIC_RESET_SENT: &str =
    "If an account with this email exists, password reset instructions have been sent.";

/// Shown for any reset-token problem (missing, mismatched, or expired).
const GENERIC_RESET_ERROR: &str =
    "Invalid or expired reset token. Please request a new password reset.";

const RESET_SUCCESS_BANNER: &str =
    "Your password has been reset successfully. You can now log in with your new password.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Set to "success" after a completed password reset.
    pub reset: Option<String>,
}

/// Query parameters for the reset-password page.
#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub email: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub email: String,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub email: String,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub error: Option<String>,
    pub token: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    let success =
        (query.reset.as_deref() == Some("success")).then(|| RESET_SUCCESS_BANNER.to_string());

    LoginTemplate {
        error: None,
        success,
        email: String::new(),
    }
}

/// Handle login form submission.
///
/// Credential checking is delegated to the vault; any failure re-renders the
/// form with one generic message.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if form.email.is_empty() || form.password.is_empty() {
        return Ok(LoginTemplate {
            error: Some("Email and password are required".to_string()),
            success: None,
            email: form.email,
        }
        .into_response());
    }

    match state.vault().authenticate(&form.email, &form.password).await {
        Ok(record) => {
            let token = state.vault().mint_auth_token(&record)?;
            let jar = jar.add(session_cookie(token));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(err @ VaultError::InvalidCredentials) => {
            tracing::warn!("login failed: {err}");
            Ok(LoginTemplate {
                error: Some(GENERIC_LOGIN_ERROR.to_string()),
                success: None,
                email: form.email,
            }
            .into_response())
        }
        Err(err) => Err(err.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page() -> impl IntoResponse {
    RegisterTemplate {
        error: None,
        email: String::new(),
    }
}

/// Handle registration form submission.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let render_error = |email: String, message: String| {
        RegisterTemplate {
            error: Some(message),
            email,
        }
        .into_response()
    };

    if form.email.is_empty() || form.password.is_empty() {
        return Ok(render_error(
            form.email,
            "Email and password are required".to_string(),
        ));
    }

    if form.password != form.password_confirm {
        return Ok(render_error(
            form.email,
            "Passwords do not match".to_string(),
        ));
    }

    let record = match state
        .vault()
        .create_record(&form.email, &form.password)
        .await
    {
        Ok(record) => record,
        Err(VaultError::DuplicateEmail) => {
            return Ok(render_error(
                form.email,
                "An account with this email already exists. Please use the login page or reset \
                 your password."
                    .to_string(),
            ));
        }
        Err(VaultError::InvalidEmail(err)) => {
            return Ok(render_error(form.email, err.to_string()));
        }
        Err(VaultError::WeakPassword(message)) => {
            return Ok(render_error(form.email, message));
        }
        Err(err) => return Err(err.into()),
    };

    // Registration succeeded but token generation failed - redirect to login
    match state.vault().mint_auth_token(&record) {
        Ok(token) => {
            let jar = jar.add(session_cookie(token));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(err) => {
            tracing::warn!("token mint after registration failed: {err}");
            Ok(Redirect::to("/auth/login").into_response())
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Clears the session cookie unconditionally; repeating it is harmless.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(clear_session_cookie());
    (jar, Redirect::to("/auth/login"))
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page() -> impl IntoResponse {
    ForgotPasswordTemplate {
        error: None,
        success: None,
        email: String::new(),
    }
}

/// Handle forgot password form submission.
///
/// The response body is identical whether or not the account exists; only
/// the issuing browser's cookies differ.
pub async fn forgot_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response, AppError> {
    if form.email.is_empty() {
        return Ok(ForgotPasswordTemplate {
            error: Some("Email is required".to_string()),
            success: None,
            email: String::new(),
        }
        .into_response());
    }

    let page = ForgotPasswordTemplate {
        error: None,
        success: Some(GENERIC_RESET_SENT.to_string()),
        email: String::new(),
    };

    match state.vault().find_record_by_email(&form.email).await {
        Ok(Some(_)) => {
            let token = generate_reset_token();
            let jar = jar
                .add(reset_token_cookie(token))
                .add(reset_email_cookie(form.email));
            Ok((jar, page).into_response())
        }
        Ok(None) | Err(VaultError::InvalidEmail(_)) => Ok(page.into_response()),
        Err(err) => Err(err.into()),
    }
}

/// Display the reset password page.
///
/// The token comes from the `?token=` query or falls back to the
/// `reset_token` cookie set by the forgot-password step.
pub async fn reset_password_page(
    jar: CookieJar,
    Query(query): Query<ResetQuery>,
) -> Response {
    let cookie_token = jar
        .get(cookies::RESET_TOKEN)
        .map(|cookie| cookie.value().to_owned());

    match (query.token, cookie_token) {
        (None, None) => Redirect::to("/auth/forgot-password").into_response(),
        (Some(token), Some(cookie)) if token == cookie => ResetPasswordTemplate {
            error: None,
            token,
        }
        .into_response(),
        (None, Some(cookie)) => ResetPasswordTemplate {
            error: None,
            token: cookie,
        }
        .into_response(),
        _ => ResetPasswordTemplate {
            error: Some(GENERIC_RESET_ERROR.to_string()),
            token: String::new(),
        }
        .into_response(),
    }
}

/// Handle reset password form submission.
///
/// The submitted token must match the browser-bound `reset_token` cookie
/// exactly and still be inside its one-hour window.
pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    if form.token.is_empty() || form.password.is_empty() {
        return Ok(reset_error(
            form.token,
            "Token and password are required",
        ));
    }

    if form.password != form.password_confirm {
        return Ok(reset_error(form.token, "Passwords do not match"));
    }

    let Some(cookie) = jar.get(cookies::RESET_TOKEN) else {
        return Ok(reset_error(form.token, GENERIC_RESET_ERROR));
    };
    if cookie.value() != form.token || !reset_token_is_fresh(&form.token, Utc::now()) {
        return Ok(reset_error(form.token, GENERIC_RESET_ERROR));
    }

    let Some(email) = jar
        .get(cookies::RESET_EMAIL)
        .map(|cookie| cookie.value().to_owned())
    else {
        return Ok(reset_error(
            form.token,
            "Reset session expired. Please request a new password reset.",
        ));
    };

    let record = match state.vault().find_record_by_email(&email).await {
        Ok(Some(record)) => record,
        Ok(None) | Err(VaultError::InvalidEmail(_)) => {
            return Ok(reset_error(form.token, GENERIC_RESET_ERROR));
        }
        Err(err) => return Err(err.into()),
    };

    match state.vault().set_password(record.id, &form.password).await {
        Ok(()) => {
            let jar = clear_reset_cookies(jar);
            Ok((jar, Redirect::to("/auth/login?reset=success")).into_response())
        }
        Err(VaultError::WeakPassword(message)) => Ok(reset_error(form.token, &message)),
        Err(err) => Err(err.into()),
    }
}

fn reset_error(token: String, message: &str) -> Response {
    ResetPasswordTemplate {
        error: Some(message.to_string()),
        token,
    }
    .into_response()
}

// =============================================================================
// Reset Tokens
// =============================================================================

/// Random prefix length of a reset token.
const RESET_TOKEN_RANDOM_LEN: usize = 32;

/// Window during which a reset token is honored, in seconds.
const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Generate a reset token: 32 random alphanumeric characters plus the unix
/// issued-at, separated by a dot.
///
/// The token is bound to the issuing browser via the `reset_token` cookie;
/// the embedded timestamp lets the server enforce the one-hour window even
/// if the cookie outlives its Max-Age.
fn generate_reset_token() -> String {
    let random: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(RESET_TOKEN_RANDOM_LEN)
        .map(char::from)
        .collect();

    format!("{random}.{}", Utc::now().timestamp())
}

/// Check the issued-at embedded in a reset token against the one-hour window.
fn reset_token_is_fresh(token: &str, now: DateTime<Utc>) -> bool {
    let Some((_, timestamp)) = token.rsplit_once('.') else {
        return false;
    };
    let Ok(seconds) = timestamp.parse::<i64>() else {
        return false;
    };
    let Some(issued_at) = Utc.timestamp_opt(seconds, 0).single() else {
        return false;
    };

    let age = now.signed_duration_since(issued_at);
    age >= chrono::Duration::zero() && age.num_seconds() <= RESET_TOKEN_TTL_SECS
}
