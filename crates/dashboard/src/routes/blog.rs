//! Blog route handlers.
//!
//! Listing and reading posts is public and uses an anonymous Firestore
//! handle; writing requires a signed-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bluefitt_core::{Fetch, Post};

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::services::blog::{self, NewPost};
use crate::services::identity;
use crate::state::AppState;

use super::{MessageQuery, NotFoundTemplate, UserView, message_for, redirect_with, session_failure};

/// Post view for templates.
#[derive(Debug, Clone)]
pub struct PostView {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub cover_image: Option<String>,
    pub tags: Vec<String>,
    pub author_name: String,
    pub created_at: String,
    pub content_html: String,
}

impl PostView {
    fn new(post: &Post, state: &AppState) -> Self {
        Self {
            slug: post.slug.to_string(),
            title: post.title.clone(),
            summary: post.summary(),
            cover_image: post.cover_image.as_deref().map(|c| state.image_url(c)),
            tags: post.tags.clone(),
            author_name: post.author_name.clone(),
            created_at: post.created_at.to_rfc3339(),
            content_html: String::new(),
        }
    }
}

/// Blog index page template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub posts: Vec<PostView>,
    pub fetch_error: Option<String>,
    pub success: Option<String>,
}

/// Blog post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub post: PostView,
}

/// New post form template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/new.html")]
pub struct BlogNewTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub error: Option<String>,
}

/// New post form data.
#[derive(Debug, Deserialize)]
pub struct NewPostForm {
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: String,
    /// Checkbox; present when checked.
    #[serde(default)]
    pub published: Option<String>,
}

impl From<NewPostForm> for NewPost {
    fn from(form: NewPostForm) -> Self {
        Self {
            title: form.title,
            excerpt: form.excerpt,
            content: form.content,
            cover_image: form.cover_image,
            tags: form.tags,
            published: form.published.is_some(),
        }
    }
}

/// Build the blog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blog", get(index).post(create))
        .route("/blog/new", get(new_post))
        .route("/blog/{slug}", get(show))
}

/// Display published posts, newest first.
#[instrument(skip(state, user))]
async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    let fetch = match state.identity().public_store() {
        Ok(store) => blog::posts(&store).await,
        Err(e) => Fetch::failed(e),
    };

    BlogIndexTemplate {
        current_user: user.as_ref().map(UserView::from),
        current_path: "/blog".to_string(),
        posts: fetch
            .data
            .unwrap_or_default()
            .iter()
            .map(|p| PostView::new(p, &state))
            .collect(),
        fetch_error: fetch.error,
        success: (query.success.as_deref() == Some("draft-saved"))
            .then(|| "Borrador guardado. No aparecerá en el blog hasta publicarlo.".to_string()),
    }
    .into_response()
}

/// Display a single post by slug. Drafts are not shown.
#[instrument(skip(state, user))]
async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Response {
    let current_user = user.as_ref().map(UserView::from);
    let current_path = format!("/blog/{}", urlencoding::encode(&slug));

    let fetch = match state.identity().public_store() {
        Ok(store) => blog::post(&store, &slug).await,
        Err(e) => Fetch::failed(e),
    };

    match (fetch.data, fetch.error) {
        (Some(post), _) if post.published => {
            let mut view = PostView::new(&post, &state);
            view.content_html = blog::render_markdown(&post.content);
            BlogShowTemplate {
                current_user,
                current_path,
                post: view,
            }
            .into_response()
        }
        (None, Some(error)) => {
            tracing::warn!(slug = %slug, error = %error, "Failed to load post");
            (
                StatusCode::BAD_GATEWAY,
                NotFoundTemplate {
                    current_user,
                    current_path,
                    message: format!("No se pudo cargar la publicación: {error}"),
                },
            )
                .into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            NotFoundTemplate {
                current_user,
                current_path,
                message: "La publicación no existe.".to_string(),
            },
        )
            .into_response(),
    }
}

/// Display the new post form.
async fn new_post(RequireAuth(user): RequireAuth, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    BlogNewTemplate {
        current_user: Some(UserView::from(&user)),
        current_path: "/blog/new".to_string(),
        error: message_for(query.error.as_deref(), &[blog::error_message, identity::error_message]),
    }
}

/// Handle new post form submission.
#[instrument(skip(state, session, user, form), fields(uid = %user.uid))]
async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<NewPostForm>,
) -> Response {
    let (user, store) = match state.identity().user_store(&session).await {
        Ok(pair) => pair,
        Err(e) => return session_failure(e, "/blog/new"),
    };

    let author_name = UserView::from(&user).name;
    let new_post = NewPost::from(form);
    let published = new_post.published;
    match blog::create_post(&store, &user.uid, &author_name, new_post, Utc::now()).await {
        Ok(slug) => {
            add_breadcrumb("blog", "Created post", Some(&[("slug", slug.as_str())]));
            if published {
                Redirect::to(&format!("/blog/{}", urlencoding::encode(slug.as_str()))).into_response()
            } else {
                redirect_with("/blog", "success", "draft-saved")
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Post not created");
            redirect_with("/blog/new", "error", e.code())
        }
    }
}
