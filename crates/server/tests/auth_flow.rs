//! End-to-end tests for the auth flows.
//!
//! Drives the real router in-process against an in-memory vault; no network
//! or on-disk state.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use chrono::{Duration, Utc};
use secrecy::SecretString;
use tower::ServiceExt;

use tidegate_server::config::ServerConfig;
use tidegate_server::routes;
use tidegate_server::state::AppState;
use tidegate_server::vault::Vault;

const TEST_SECRET: &str = "kT9#vWq2$mZx8@pL4!nRc6&dFh1*gJb3";

const EMAIL: &str = "user@example.com";
const PASSWORD: &str = "correct horse battery";

async fn test_app() -> (Router, AppState) {
    let vault = Vault::open_in_memory(&SecretString::from(TEST_SECRET))
        .await
        .expect("in-memory vault");

    let config = ServerConfig {
        host: "127.0.0.1".parse().expect("host"),
        port: 0,
        data_dir: std::path::PathBuf::from("./tg_data"),
        token_secret: SecretString::from(TEST_SECRET),
        sentry_dsn: None,
    };

    let state = AppState::new(config, vault);
    let app = routes::routes().with_state(state.clone());
    (app, state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn get_with_cookies(uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .expect("request")
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_form_with_cookies(uri: &str, cookies: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, cookies)
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

/// Pull a cookie's value out of the response's Set-Cookie headers.
fn set_cookie_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .find_map(|header_value| {
            let raw = header_value.to_str().ok()?;
            let pair = raw.split(';').next()?;
            let (cookie_name, value) = pair.split_once('=')?;
            (cookie_name == name).then(|| value.to_string())
        })
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_page_renders() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/auth/login")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("Log in"));
    assert!(body.contains("/auth/forgot-password"));
}

#[tokio::test]
async fn login_page_shows_reset_banner() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(get("/auth/login?reset=success"))
        .await
        .expect("response");
    let body = body_string(response).await;
    assert!(body.contains("Your password has been reset successfully"));
}

#[tokio::test]
async fn login_with_valid_credentials_sets_cookie_and_redirects_home() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");

    let response = app
        .oneshot(post_form(
            "/auth/login",
            &format!("email={EMAIL}&password={PASSWORD}"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let token = set_cookie_value(&response, "pb_auth").expect("session cookie");
    assert!(!token.is_empty());
    assert!(state.vault().find_record_by_token(&token).await.is_ok());
}

#[tokio::test]
async fn login_with_wrong_password_rerenders_form_without_cookie() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");

    let response = app
        .oneshot(post_form(
            "/auth/login",
            &format!("email={EMAIL}&password=totally wrong"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie_value(&response, "pb_auth").is_none());

    let body = body_string(response).await;
    assert!(body.contains("Invalid email or password"));
    // The submitted email stays in the form
    assert!(body.contains(EMAIL));
}

#[tokio::test]
async fn login_with_unknown_email_gets_the_same_generic_error() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(post_form(
            "/auth/login",
            "email=nobody@example.com&password=whatever9",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Invalid email or password"));
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn register_creates_record_and_logs_in() {
    let (app, state) = test_app().await;

    let response = app
        .oneshot(post_form(
            "/auth/register",
            &format!("email={EMAIL}&password={PASSWORD}&password_confirm={PASSWORD}"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(set_cookie_value(&response, "pb_auth").is_some());

    let record = state
        .vault()
        .find_record_by_email(EMAIL)
        .await
        .expect("lookup");
    assert!(record.is_some());
}

#[tokio::test]
async fn register_with_mismatched_confirmation_creates_nothing() {
    let (app, state) = test_app().await;

    let response = app
        .oneshot(post_form(
            "/auth/register",
            &format!("email={EMAIL}&password={PASSWORD}&password_confirm=something else"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Passwords do not match"));

    let record = state
        .vault()
        .find_record_by_email(EMAIL)
        .await
        .expect("lookup");
    assert!(record.is_none());
}

#[tokio::test]
async fn register_with_existing_email_rerenders_with_error() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");

    let response = app
        .oneshot(post_form(
            "/auth/register",
            &format!("email={EMAIL}&password={PASSWORD}&password_confirm={PASSWORD}"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("already exists"));
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn logout_clears_cookie_even_without_a_session() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/auth/logout")).await.expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    let cleared = set_cookie_value(&response, "pb_auth").expect("clearing cookie");
    assert!(cleared.is_empty());
}

// =============================================================================
// Session bridge
// =============================================================================

#[tokio::test]
async fn home_requires_authentication() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn home_rejects_a_garbage_token() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(get_with_cookies("/", "pb_auth=bogus.token.value"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn home_renders_for_an_authenticated_session() {
    let (app, state) = test_app().await;
    let record = state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");
    let token = state.vault().mint_auth_token(&record).expect("token");

    let response = app
        .oneshot(get_with_cookies("/", &format!("pb_auth={token}")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let cache_control = response
        .headers()
        .get(header::CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cache_control.contains("no-store"));

    let body = body_string(response).await;
    assert!(body.contains(EMAIL));
}

// =============================================================================
// Forgot password
// =============================================================================

#[tokio::test]
async fn forgot_password_response_is_identical_for_known_and_unknown_emails() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");

    let known = app
        .clone()
        .oneshot(post_form("/auth/forgot-password", &format!("email={EMAIL}")))
        .await
        .expect("response");
    let unknown = app
        .oneshot(post_form(
            "/auth/forgot-password",
            "email=nobody@example.com",
        ))
        .await
        .expect("response");

    assert_eq!(known.status(), StatusCode::OK);
    assert_eq!(unknown.status(), StatusCode::OK);

    // Reset cookies are only issued for the real account
    assert!(set_cookie_value(&known, "reset_token").is_some());
    assert!(set_cookie_value(&known, "reset_email").is_some());
    assert!(set_cookie_value(&unknown, "reset_token").is_none());

    // The page bodies do not differ
    let known_body = body_string(known).await;
    let unknown_body = body_string(unknown).await;
    assert_eq!(known_body, unknown_body);
    assert!(known_body.contains("If an account with this email exists"));
}

// =============================================================================
// Reset password
// =============================================================================

async fn issue_reset_cookies(app: &Router) -> (String, String) {
    let response = app
        .clone()
        .oneshot(post_form("/auth/forgot-password", &format!("email={EMAIL}")))
        .await
        .expect("response");

    let token = set_cookie_value(&response, "reset_token").expect("reset_token cookie");
    let email = set_cookie_value(&response, "reset_email").expect("reset_email cookie");
    (token, email)
}

#[tokio::test]
async fn reset_password_page_redirects_without_any_token() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(get("/auth/reset-password"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/forgot-password");
}

#[tokio::test]
async fn reset_password_page_rejects_a_token_that_does_not_match_the_cookie() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");
    let (token, _) = issue_reset_cookies(&app).await;

    let response = app
        .oneshot(get_with_cookies(
            "/auth/reset-password?token=different-token",
            &format!("reset_token={token}"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Invalid or expired reset token"));
}

#[tokio::test]
async fn reset_password_full_flow_rotates_the_password() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");
    let (token, email_cookie) = issue_reset_cookies(&app).await;

    // The reset page picks the token up from the cookie
    let page = app
        .clone()
        .oneshot(get_with_cookies(
            "/auth/reset-password",
            &format!("reset_token={token}"),
        ))
        .await
        .expect("response");
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_string(page).await.contains(&token));

    let cookies = format!("reset_token={token}; reset_email={email_cookie}");
    let response = app
        .oneshot(post_form_with_cookies(
            "/auth/reset-password",
            &cookies,
            &format!(
                "token={token}&password=brand new password&password_confirm=brand new password"
            ),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?reset=success");

    // Both reset cookies are cleared
    assert_eq!(
        set_cookie_value(&response, "reset_token").as_deref(),
        Some("")
    );
    assert_eq!(
        set_cookie_value(&response, "reset_email").as_deref(),
        Some("")
    );

    // Old password no longer works, the new one does
    assert!(state.vault().authenticate(EMAIL, PASSWORD).await.is_err());
    assert!(
        state
            .vault()
            .authenticate(EMAIL, "brand new password")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn reset_password_rejects_a_mismatched_token() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");
    let (token, email_cookie) = issue_reset_cookies(&app).await;

    let cookies = format!("reset_token={token}; reset_email={email_cookie}");
    let response = app
        .oneshot(post_form_with_cookies(
            "/auth/reset-password",
            &cookies,
            "token=forged-token&password=brand new password&password_confirm=brand new password",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Invalid or expired reset token"));

    // The password is unchanged
    assert!(state.vault().authenticate(EMAIL, PASSWORD).await.is_ok());
}

#[tokio::test]
async fn reset_password_rejects_an_expired_token() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");

    // A token whose embedded issued-at is two hours old, matching cookie and
    // form exactly: only the window check can fail it
    let stale = (Utc::now() - Duration::hours(2)).timestamp();
    let token = format!("abcdefghijklmnopqrstuvwxyz012345.{stale}");

    let cookies = format!("reset_token={token}; reset_email={EMAIL}");
    let response = app
        .oneshot(post_form_with_cookies(
            "/auth/reset-password",
            &cookies,
            &format!(
                "token={token}&password=brand new password&password_confirm=brand new password"
            ),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Invalid or expired reset token"));
    assert!(state.vault().authenticate(EMAIL, PASSWORD).await.is_ok());
}

#[tokio::test]
async fn reset_password_rejects_mismatched_confirmation() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");
    let (token, email_cookie) = issue_reset_cookies(&app).await;

    let cookies = format!("reset_token={token}; reset_email={email_cookie}");
    let response = app
        .oneshot(post_form_with_cookies(
            "/auth/reset-password",
            &cookies,
            &format!("token={token}&password=brand new password&password_confirm=different"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Passwords do not match"));
}

// =============================================================================
// JSON API
// =============================================================================

#[tokio::test]
async fn api_login_returns_token_and_record() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");

    let response = app
        .oneshot(post_form(
            "/api/auth/login",
            &format!("email={EMAIL}&password={PASSWORD}"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie_value(&response, "pb_auth").is_some());

    let body = body_string(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).expect("json body");
    assert!(json["token"].as_str().is_some_and(|token| !token.is_empty()));
    assert_eq!(json["record"]["email"], EMAIL);
}

#[tokio::test]
async fn api_login_with_bad_credentials_is_unauthorized() {
    let (app, state) = test_app().await;
    state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");

    let response = app
        .oneshot(post_form(
            "/api/auth/login",
            &format!("email={EMAIL}&password=wrong password"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie_value(&response, "pb_auth").is_none());
}

#[tokio::test]
async fn api_register_then_duplicate_conflicts() {
    let (app, _) = test_app().await;

    let first = app
        .clone()
        .oneshot(post_form(
            "/api/auth/register",
            &format!("email={EMAIL}&password={PASSWORD}"),
        ))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post_form(
            "/api/auth/register",
            &format!("email={EMAIL}&password={PASSWORD}"),
        ))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn api_refresh_accepts_the_session_cookie() {
    let (app, state) = test_app().await;
    let record = state
        .vault()
        .create_record(EMAIL, PASSWORD)
        .await
        .expect("record");
    let token = state.vault().mint_auth_token(&record).expect("token");

    let response = app
        .oneshot(post_form_with_cookies(
            "/api/auth/refresh",
            &format!("pb_auth={token}"),
            "",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).expect("json body");
    let fresh = json["token"].as_str().expect("token field");
    assert!(state.vault().find_record_by_token(fresh).await.is_ok());
}

#[tokio::test]
async fn api_refresh_without_any_token_is_a_bad_request() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(post_form("/api/auth/refresh", ""))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_refresh_with_an_invalid_token_is_unauthorized() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(post_form("/api/auth/refresh", "token=bogus.token.value"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
