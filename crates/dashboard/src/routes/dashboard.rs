//! Dashboard overview route.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::services::{blog, catalog, directory};
use crate::state::AppState;

use super::session_failure;

/// Stock at or below this counts as low.
const LOW_STOCK_THRESHOLD: i64 = 5;

/// Signed-in user as shown in the navigation.
#[derive(Debug, Clone)]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub initials: String,
    pub role_label: String,
    pub is_admin: bool,
}

impl From<&CurrentUser> for UserView {
    fn from(user: &CurrentUser) -> Self {
        Self {
            name: if user.display_name.is_empty() {
                user.email.clone()
            } else {
                user.display_name.clone()
            },
            email: user.email.clone(),
            initials: user.initials(),
            role_label: user.role.label().to_string(),
            is_admin: user.is_admin(),
        }
    }
}

/// One summary card. `value` is `None` when its read failed.
#[derive(Debug, Clone)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: Option<String>,
    pub href: &'static str,
    pub icon: &'static str,
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub greeting_name: String,
    pub metrics: Vec<MetricCard>,
    pub errors: Vec<String>,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// Dashboard overview.
///
/// Each card is an independent read; a failed read blanks its card and adds
/// an error line without affecting the others.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Response {
    let (user, store) = match state.identity().user_store(&session).await {
        Ok(pair) => pair,
        Err(e) => return session_failure(e, "/"),
    };

    let mut errors = Vec::new();
    let mut metrics = Vec::new();

    let products = catalog::products(&store, None).await;
    if let Some(error) = &products.error {
        errors.push(format!("Productos: {error}"));
    }
    let products = products.data;
    metrics.push(MetricCard {
        label: "Productos",
        value: products.as_ref().map(|p| p.len().to_string()),
        href: "/products",
        icon: "ph-package",
    });
    metrics.push(MetricCard {
        label: "Categorías",
        value: products
            .as_ref()
            .map(|p| catalog::categories(p).len().to_string()),
        href: "/products",
        icon: "ph-squares-four",
    });
    metrics.push(MetricCard {
        label: "Stock bajo",
        value: products.as_ref().map(|p| {
            p.iter()
                .filter(|product| product.stock <= LOW_STOCK_THRESHOLD)
                .count()
                .to_string()
        }),
        href: "/products",
        icon: "ph-warning",
    });

    let posts = blog::posts(&store).await;
    if let Some(error) = &posts.error {
        errors.push(format!("Blog: {error}"));
    }
    metrics.push(MetricCard {
        label: "Publicaciones",
        value: posts.data.map(|p| p.len().to_string()),
        href: "/blog",
        icon: "ph-article",
    });

    if user.is_admin() {
        let users = directory::users(&store).await;
        if let Some(error) = &users.error {
            errors.push(format!("Usuarios: {error}"));
        }
        metrics.push(MetricCard {
            label: "Usuarios",
            value: users.data.map(|u| u.len().to_string()),
            href: "/admin/users",
            icon: "ph-users",
        });
    }

    DashboardTemplate {
        greeting_name: UserView::from(&user).name,
        current_user: Some(UserView::from(&user)),
        current_path: "/".to_string(),
        metrics,
        errors,
    }
    .into_response()
}
