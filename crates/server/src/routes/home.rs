//! Home page route handler (protected).

use askama::Template;
use askama_web::WebTemplate;
use axum::http::header;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::RequireAuth;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Email of the signed-in user.
    pub email: String,
}

/// Display the home page for the authenticated user.
pub async fn home(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    // Authenticated pages are never cacheable.
    (
        [
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, max-age=0",
            ),
            (header::PRAGMA, "no-cache"),
        ],
        HomeTemplate {
            email: user.email.to_string(),
        },
    )
}
