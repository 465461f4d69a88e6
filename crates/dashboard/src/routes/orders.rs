//! Orders placeholder route.
//!
//! Orders are not stored anywhere yet; the page only explains that.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Router, response::IntoResponse, routing::get};

use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::UserView;

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
}

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new().route("/orders", get(index))
}

async fn index(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    OrdersTemplate {
        current_user: Some(UserView::from(&user)),
        current_path: "/orders".to_string(),
    }
}
