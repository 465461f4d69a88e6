//! Authentication extractors.
//!
//! Every extractor asks [`bluefitt_core::guard::authorize`] for a decision
//! and only translates the resulting [`Access`] into a response. Paths under
//! `/api/` get bare 401/403 status codes instead of redirects and pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use bluefitt_core::guard::{Access, IdentityState, Requirement, authorize};

use crate::filters;
use crate::models::{CurrentUser, session_keys};
use crate::routes::UserView;

/// Access-denied panel shown in place of an admin-only page.
#[derive(Template, WebTemplate)]
#[template(path = "access_denied.html")]
pub struct AccessDeniedTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
}

/// Placeholder page while the viewer's identity is unresolved.
#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub return_path: String,
}

/// Error returned when a route guard refuses the request.
pub enum AuthRejection {
    /// Identity still loading.
    Pending(String),
    /// Send the viewer to another page (sign-in or dashboard).
    Redirect(String),
    /// Render the access-denied panel.
    AccessDenied {
        user: Box<CurrentUser>,
        path: String,
    },
    /// Unauthorized response (for API requests or a missing session layer).
    Unauthorized,
    /// Forbidden response (for API requests).
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Pending(return_path) => LoadingTemplate { return_path }.into_response(),
            Self::Redirect(target) => Redirect::to(&target).into_response(),
            Self::AccessDenied { user, path } => (
                StatusCode::FORBIDDEN,
                AccessDeniedTemplate {
                    current_user: Some(UserView::from(user.as_ref())),
                    current_path: path,
                },
            )
                .into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

/// Run the guard for `requirement` against the session in `parts`.
async fn guard(parts: &Parts, requirement: Requirement) -> Result<CurrentUser, AuthRejection> {
    // Get the session from extensions (set by SessionManagerLayer)
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    let user = current_user(session).await;
    let state = user
        .as_ref()
        .map_or(IdentityState::Anonymous, CurrentUser::identity_state);
    let return_path = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
    let is_api = parts.uri.path().starts_with("/api/");

    match (authorize(state, requirement, return_path), user) {
        (Access::Allow, Some(user)) => Ok(user),
        (Access::Allow | Access::Redirect(_), None) if is_api => Err(AuthRejection::Unauthorized),
        (Access::Redirect(_) | Access::Deny, Some(_)) if is_api => Err(AuthRejection::Forbidden),
        (Access::Redirect(target), _) => Err(AuthRejection::Redirect(target)),
        (Access::Deny, Some(user)) => Err(AuthRejection::AccessDenied {
            user: Box::new(user),
            path: parts.uri.path().to_owned(),
        }),
        (Access::Pending, _) => Err(AuthRejection::Pending(return_path.to_owned())),
        (Access::Allow | Access::Deny, None) => Err(AuthRejection::Unauthorized),
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Extractor that requires a signed-in user.
///
/// Signed-out viewers are redirected to `/auth/login?next=<path>`.
///
/// ```rust,ignore
/// async fn dashboard(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hola, {}", user.display_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, Requirement::Authenticated).await.map(Self)
    }
}

/// Extractor that requires an admin; other roles see the access-denied panel.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, Requirement::ADMIN_PANEL).await.map(Self)
    }
}

/// Extractor that requires an admin; other roles are sent to the dashboard.
///
/// Used on admin form actions, where an in-place panel makes no sense.
pub struct RequireAdminOrRedirect(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdminOrRedirect
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, Requirement::ADMIN_REDIRECT).await.map(Self)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is signed in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}
