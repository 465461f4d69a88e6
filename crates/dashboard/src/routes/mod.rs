//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (backend configured)
//!
//! # Dashboard (auth)
//! GET  /                            - Overview
//!
//! # Catalog (auth)
//! GET  /products?category=          - Product list with category filter
//! GET  /products/{id}               - Product detail
//!
//! # Blog
//! GET  /blog                        - Published posts (public)
//! GET  /blog/new                    - New post form (auth)
//! POST /blog                        - Create post (auth)
//! GET  /blog/{slug}                 - Post detail (public)
//!
//! # Orders (auth)
//! GET  /orders                      - Placeholder
//!
//! # User administration (admin)
//! GET  /admin/users                 - User list (access-denied panel otherwise)
//! POST /admin/users/{uid}/role      - Change role
//! POST /admin/users/{uid}/delete    - Delete profile document
//!
//! # Settings (auth)
//! GET  /settings                    - Profile, appearance, account
//! POST /settings/profile            - Update display name and company
//! POST /settings/account/delete     - Delete own account
//!
//! # Auth
//! GET  /auth/login                  - Sign-in page
//! POST /auth/login                  - Sign in
//! GET  /auth/register               - Registration page
//! POST /auth/register               - Register
//! POST /auth/logout                 - Sign out
//! ```

pub mod admin_users;
pub mod auth;
pub mod blog;
pub mod dashboard;
pub mod health;
pub mod orders;
pub mod products;
pub mod settings;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use bluefitt_core::guard::login_redirect;

use crate::error::AppError;
use crate::filters;
use crate::services::AuthError;
use crate::state::AppState;

pub use dashboard::UserView;

/// Create all routes for the dashboard.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(dashboard::router())
        .merge(products::router())
        .merge(blog::router())
        .merge(orders::router())
        .merge(admin_users::router())
        .merge(settings::router())
        .merge(auth::router())
        .fallback(not_found)
}

// =============================================================================
// Shared Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Not-found page.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub message: String,
}

async fn not_found(uri: axum::http::Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            current_user: None,
            current_path: uri.path().to_owned(),
            message: "La página que buscas no existe.".to_string(),
        },
    )
        .into_response()
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Redirect to `path` with `key=code` appended to the query string.
pub(crate) fn redirect_with(path: &str, key: &str, code: &str) -> Response {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!(
        "{path}{separator}{key}={}",
        urlencoding::encode(code)
    ))
    .into_response()
}

/// Response for a request whose session identity could not be used.
///
/// Revoked or missing sessions go back to sign-in; anything else is an error.
pub(crate) fn session_failure(err: AuthError, return_path: &str) -> Response {
    if err.ends_session() {
        tracing::info!(error = %err, "Session ended, redirecting to sign-in");
        Redirect::to(&login_redirect(return_path)).into_response()
    } else {
        AppError::from(err).into_response()
    }
}

/// Localized message for a query code, looked up in order.
pub(crate) fn message_for(
    code: Option<&str>,
    lookups: &[fn(&str) -> Option<&'static str>],
) -> Option<String> {
    let code = code?.trim();
    if code.is_empty() {
        return None;
    }
    let message = lookups
        .iter()
        .find_map(|lookup| lookup(code))
        .unwrap_or("Ocurrió un error inesperado. Inténtalo de nuevo.");
    Some(message.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header;

    use super::*;
    use crate::services::identity;

    #[test]
    fn test_redirect_with_appends_code() {
        let response = redirect_with("/auth/login?next=%2Fsettings", "error", "invalid-credentials");
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login?next=%2Fsettings&error=invalid-credentials"
        );

        let response = redirect_with("/admin/users", "success", "role-updated");
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/admin/users?success=role-updated"
        );
    }

    #[test]
    fn test_message_for() {
        assert_eq!(message_for(None, &[identity::error_message]), None);
        assert_eq!(message_for(Some(" "), &[identity::error_message]), None);
        assert_eq!(
            message_for(Some("missing-name"), &[identity::error_message]).as_deref(),
            Some("El nombre es obligatorio.")
        );
        assert!(message_for(Some("no-such-code"), &[identity::error_message]).is_some());
    }

    #[test]
    fn test_revoked_session_goes_to_sign_in() {
        let response = session_failure(AuthError::NotSignedIn, "/settings");
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login?next=%2Fsettings"
        );

        let response = session_failure(AuthError::BackendDisabled("off".to_string()), "/settings");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
