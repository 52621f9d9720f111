//! HTTP middleware for the gateway.
//!
//! Request logging is tower-http's `TraceLayer`, applied in `main`. The
//! session bridge lives here as an extractor rather than a layer so the
//! resolved user reaches handlers as an explicit parameter.

pub mod auth;

pub use auth::{
    AuthRejection, RequireAuth, clear_reset_cookies, clear_session_cookie, reset_email_cookie,
    reset_token_cookie, session_cookie,
};
