//! Account settings routes.
//!
//! Three sections: profile (display name, company), appearance (shown but
//! disabled) and account deletion.

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

use crate::error::clear_sentry_user;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::identity;
use crate::state::AppState;

use super::{MessageQuery, UserView, message_for, redirect_with};

const SETTINGS_PATH: &str = "/settings";

/// Settings page template.
#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub display_name: String,
    pub email: String,
    pub company: String,
    pub role_label: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub display_name: String,
    #[serde(default)]
    pub company: String,
}

/// Account deletion form data.
#[derive(Debug, Deserialize)]
pub struct DeleteAccountForm {
    /// Must repeat the account email.
    pub confirm_email: String,
}

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(SETTINGS_PATH, get(settings_page))
        .route("/settings/profile", post(update_profile))
        .route("/settings/account/delete", post(delete_account))
}

fn settings_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "profile-updated" => "Perfil actualizado.",
        "confirm-mismatch" => "El correo de confirmación no coincide con el de tu cuenta.",
        _ => return None,
    })
}

/// Render the settings page.
async fn settings_page(RequireAuth(user): RequireAuth, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    SettingsTemplate {
        current_user: Some(UserView::from(&user)),
        current_path: SETTINGS_PATH.to_string(),
        display_name: user.display_name.clone(),
        email: user.email.clone(),
        company: user.company.clone().unwrap_or_default(),
        role_label: user.role.label().to_string(),
        error: message_for(query.error.as_deref(), &[settings_message, identity::error_message]),
        success: query
            .success
            .as_deref()
            .and_then(settings_message)
            .map(str::to_string),
    }
}

/// Update display name and company.
#[instrument(skip(state, session, user, form), fields(uid = %user.uid))]
async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Response {
    match state
        .identity()
        .update_profile(&session, &form.display_name, Some(form.company.as_str()))
        .await
    {
        Ok(_) => redirect_with(SETTINGS_PATH, "success", "profile-updated"),
        Err(e) => {
            tracing::warn!(error = %e, "Profile not updated");
            redirect_with(SETTINGS_PATH, "error", e.code())
        }
    }
}

/// Delete the signed-in account, then sign out.
#[instrument(skip(state, session, user, form), fields(uid = %user.uid))]
async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<DeleteAccountForm>,
) -> Response {
    if !form.confirm_email.trim().eq_ignore_ascii_case(&user.email) {
        return redirect_with(SETTINGS_PATH, "error", "confirm-mismatch");
    }

    match state.identity().delete_account(&session).await {
        Ok(()) => {
            clear_sentry_user();
            Redirect::to("/auth/login?success=account-deleted").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Account not deleted");
            redirect_with(SETTINGS_PATH, "error", e.code())
        }
    }
}
