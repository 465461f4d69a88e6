//! Authentication route handlers.
//!
//! Sign-in and registration go through the Identity Toolkit via
//! [`IdentityProvider`](crate::services::IdentityProvider). Failures come
//! back to the form as `?error=<code>` and are shown in Spanish.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bluefitt_core::guard::safe_return_path;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::services::identity;
use crate::state::AppState;

use super::{UserView, message_for, redirect_with};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub company: Option<String>,
}

/// Query parameters for the auth pages.
#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub error: Option<String>,
    pub success: Option<String>,
    pub next: String,
    pub backend_enabled: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub error: Option<String>,
    pub backend_enabled: bool,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/register", get(register_page).post(register))
        .route("/auth/logout", post(logout))
}

fn auth_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "password-mismatch" => "Las contraseñas no coinciden.",
        "signed-out" => "Sesión cerrada.",
        "account-deleted" => "Tu cuenta fue eliminada.",
        "session" => "No se pudo iniciar la sesión. Inténtalo de nuevo.",
        _ => return None,
    })
}

/// Login page URL carrying an error code and the return path.
fn login_error(code: &str, next: &str) -> Response {
    if next == bluefitt_core::guard::DASHBOARD_PATH {
        redirect_with("/auth/login", "error", code)
    } else {
        redirect_with(
            &format!("/auth/login?next={}", urlencoding::encode(next)),
            "error",
            code,
        )
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<AuthQuery>,
) -> Response {
    let next = safe_return_path(query.next.as_deref());
    if user.is_some() {
        return Redirect::to(next).into_response();
    }

    let backend_enabled = state.identity().is_enabled();
    let error = if backend_enabled {
        message_for(query.error.as_deref(), &[auth_message, identity::error_message])
    } else {
        identity::error_message("backend-disabled").map(str::to_string)
    };

    LoginTemplate {
        current_user: None,
        current_path: "/auth/login".to_string(),
        error,
        success: query
            .success
            .as_deref()
            .and_then(auth_message)
            .map(str::to_string),
        next: next.to_string(),
        backend_enabled,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_return_path(form.next.as_deref());

    match state
        .identity()
        .login(&session, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            set_sentry_user(&user.uid, Some(&user.email));
            Redirect::to(next).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            login_error(e.code(), next)
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
async fn register_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<AuthQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    let backend_enabled = state.identity().is_enabled();
    let error = if backend_enabled {
        message_for(query.error.as_deref(), &[auth_message, identity::error_message])
    } else {
        identity::error_message("backend-disabled").map(str::to_string)
    };

    RegisterTemplate {
        current_user: None,
        current_path: "/auth/register".to_string(),
        error,
        backend_enabled,
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.password_confirm {
        return redirect_with("/auth/register", "error", "password-mismatch");
    }

    match state
        .identity()
        .register(
            &session,
            &form.email,
            &form.password,
            &form.display_name,
            form.company.as_deref(),
        )
        .await
    {
        Ok(user) => {
            set_sentry_user(&user.uid, Some(&user.email));
            Redirect::to("/").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            redirect_with("/auth/register", "error", e.code())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip(state, session))]
async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Err(e) = state.identity().logout(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();
    redirect_with("/auth/login", "success", "signed-out")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header;

    use super::*;

    #[test]
    fn test_login_error_keeps_next() {
        let response = login_error("invalid-credentials", "/products");
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login?next=%2Fproducts&error=invalid-credentials"
        );

        let response = login_error("invalid-credentials", "/");
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login?error=invalid-credentials"
        );
    }

    #[test]
    fn test_auth_messages() {
        assert!(auth_message("password-mismatch").is_some());
        assert!(auth_message("invalid-credentials").is_none());
    }
}
