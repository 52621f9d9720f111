//! JSON auth API routes.
//!
//! Form-encoded requests in, `{token, record}` JSON out. The session cookie
//! is set alongside the JSON body so browser and programmatic clients stay
//! in step.

use axum::{Form, Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::session_cookie;
use crate::models::cookies;
use crate::state::AppState;
use crate::vault::AuthRecord;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request body. The token field is optional; the session cookie is
/// the fallback.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub token: Option<String>,
}

/// Successful auth response: the minted token plus the record it belongs to.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub record: AuthRecord,
}

/// Authenticate with email and password.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns `AppError` with a generic credentials message on any failure.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.vault().authenticate(&req.email, &req.password).await?;
    let token = state.vault().mint_auth_token(&record)?;

    let jar = jar.add(session_cookie(token.clone()));
    Ok((jar, Json(AuthResponse { token, record })))
}

/// Create an auth record and log it in.
///
/// POST /api/auth/register
///
/// # Errors
///
/// Returns `AppError` on validation failure, a duplicate email, or a vault
/// failure.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .vault()
        .create_record(&req.email, &req.password)
        .await?;
    let token = state.vault().mint_auth_token(&record)?;

    let jar = jar.add(session_cookie(token.clone()));
    Ok((jar, Json(AuthResponse { token, record })))
}

/// Re-mint the session token.
///
/// POST /api/auth/refresh
///
/// # Errors
///
/// Returns `AppError::BadRequest` when no token is supplied at all and a 401
/// when the supplied token does not verify.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Form token wins; the session cookie is the fallback.
    let auth_token = req
        .token
        .filter(|token| !token.is_empty())
        .or_else(|| {
            jar.get(cookies::PB_AUTH)
                .map(|cookie| cookie.value().to_owned())
        })
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing token".to_string()))?;

    let record = state.vault().find_record_by_token(&auth_token).await?;
    let token = state.vault().mint_auth_token(&record)?;

    let jar = jar.add(session_cookie(token.clone()));
    Ok((jar, Json(AuthResponse { token, record })))
}
