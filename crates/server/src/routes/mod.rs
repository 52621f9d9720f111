//! HTTP route handlers for the auth gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home page (requires auth)
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (vault connectivity)
//!
//! # Auth pages
//! GET  /auth/login              - Login page
//! POST /auth/login              - Login action
//! GET  /auth/register           - Register page
//! POST /auth/register           - Register action
//! GET  /auth/logout             - Logout action
//! GET  /auth/forgot-password    - Forgot password page
//! POST /auth/forgot-password    - Issue reset token
//! GET  /auth/reset-password     - Reset password page
//! POST /auth/reset-password     - Reset password action
//!
//! # Auth API (JSON)
//! POST /api/auth/login          - Login, returns {token, record}
//! POST /api/auth/register       - Register, returns {token, record}
//! POST /api/auth/refresh        - Re-mint the session token
//! ```

pub mod api;
pub mod auth;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth page routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
}

/// Create the auth API routes router.
pub fn auth_api_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(api::login))
        .route("/register", post(api::register))
        .route("/refresh", post(api::refresh))
}

/// Create all routes for the gateway.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page (protected by the RequireAuth extractor)
        .route("/", get(home::home))
        // Auth pages
        .nest("/auth", auth_routes())
        // Auth API
        .nest("/api/auth", auth_api_routes())
}
