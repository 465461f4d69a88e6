//! User administration routes (admin only).
//!
//! Deleting a user here removes only the `users/{uid}` profile document. The
//! identity account stays, and the page says so.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bluefitt_core::policy::RoleChange;
use bluefitt_core::{AppUser, UserRole, UserUid};

use crate::components::data_table::{role_options, users_table_config};
use crate::components::{DataTableConfig, FilterOption};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{RequireAdmin, RequireAdminOrRedirect};
use crate::services::{directory, identity};
use crate::state::AppState;

use super::{MessageQuery, UserView, message_for, redirect_with, session_failure};

const USERS_PATH: &str = "/admin/users";

/// User row view for templates.
#[derive(Debug, Clone)]
pub struct UserRowView {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub role: String,
    pub created_at: String,
    pub is_self: bool,
}

impl UserRowView {
    fn new(user: &AppUser, actor: &UserUid) -> Self {
        Self {
            uid: user.uid.to_string(),
            name: user.shown_name().to_string(),
            email: user.email.clone(),
            company: user.company.clone().unwrap_or_default(),
            role: user.role.as_str().to_string(),
            created_at: user.created_at.to_rfc3339(),
            is_self: &user.uid == actor,
        }
    }
}

/// Users list page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct AdminUsersTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub table: DataTableConfig,
    pub users: Vec<UserRowView>,
    pub roles: Vec<FilterOption>,
    pub fetch_error: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Role change form data.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// Build the user administration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(USERS_PATH, get(index))
        .route("/admin/users/{uid}/role", post(change_role))
        .route("/admin/users/{uid}/delete", post(delete_user))
}

fn success_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "role-updated" => "Rol actualizado.",
        "role-unchanged" => "El usuario ya tenía ese rol.",
        "user-deleted" => "Perfil eliminado. La cuenta de acceso del usuario sigue existiendo.",
        _ => return None,
    })
}

fn form_error_message(code: &str) -> Option<&'static str> {
    (code == "invalid-role").then_some("Rol no válido.")
}

/// List every user with role controls.
#[instrument(skip(state, session, _admin))]
async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<MessageQuery>,
) -> Response {
    let (admin, store) = match state.identity().user_store(&session).await {
        Ok(pair) => pair,
        Err(e) => return session_failure(e, USERS_PATH),
    };

    let fetch = directory::users(&store).await;
    if let Some(error) = &fetch.error {
        tracing::warn!(error = %error, "Failed to list users");
    }

    AdminUsersTemplate {
        current_user: Some(UserView::from(&admin)),
        current_path: USERS_PATH.to_string(),
        table: users_table_config(),
        users: fetch
            .data
            .unwrap_or_default()
            .iter()
            .map(|u| UserRowView::new(u, &admin.uid))
            .collect(),
        roles: role_options(),
        fetch_error: fetch.error,
        error: message_for(
            query.error.as_deref(),
            &[
                directory::error_message,
                form_error_message,
                identity::error_message,
            ],
        ),
        success: query
            .success
            .as_deref()
            .and_then(success_message)
            .map(str::to_string),
    }
    .into_response()
}

/// Change a user's role.
#[instrument(skip(state, session, _admin, form), fields(target_uid = %uid))]
async fn change_role(
    State(state): State<AppState>,
    session: Session,
    RequireAdminOrRedirect(_admin): RequireAdminOrRedirect,
    Path(uid): Path<String>,
    Form(form): Form<RoleForm>,
) -> Response {
    let Ok(role) = form.role.trim().parse::<UserRole>() else {
        return redirect_with(USERS_PATH, "error", "invalid-role");
    };

    let (admin, store) = match state.identity().user_store(&session).await {
        Ok(pair) => pair,
        Err(e) => return session_failure(e, USERS_PATH),
    };

    let target = UserUid::new(uid);
    match directory::change_role(&store, &admin.uid, &target, role).await {
        Ok(RoleChange::Apply) => {
            add_breadcrumb(
                "admin",
                "Changed user role",
                Some(&[("uid", target.as_str()), ("role", role.as_str())]),
            );
            redirect_with(USERS_PATH, "success", "role-updated")
        }
        Ok(RoleChange::Unchanged) => redirect_with(USERS_PATH, "success", "role-unchanged"),
        Err(e) => {
            tracing::warn!(error = %e, "Role change refused");
            redirect_with(USERS_PATH, "error", e.code())
        }
    }
}

/// Delete a user's profile document.
#[instrument(skip(state, session, _admin), fields(target_uid = %uid))]
async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    RequireAdminOrRedirect(_admin): RequireAdminOrRedirect,
    Path(uid): Path<String>,
) -> Response {
    let (admin, store) = match state.identity().user_store(&session).await {
        Ok(pair) => pair,
        Err(e) => return session_failure(e, USERS_PATH),
    };

    let target = UserUid::new(uid);
    match directory::remove_profile(&store, &admin.uid, &target).await {
        Ok(()) => {
            add_breadcrumb("admin", "Deleted user profile", Some(&[("uid", target.as_str())]));
            redirect_with(USERS_PATH, "success", "user-deleted")
        }
        Err(e) => {
            tracing::warn!(error = %e, "User removal refused");
            redirect_with(USERS_PATH, "error", e.code())
        }
    }
}
