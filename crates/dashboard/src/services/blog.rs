//! Blog posts stored under `posts/`.
//!
//! Post bodies are markdown, rendered to HTML with comrak. Raw HTML inside a
//! post is escaped.

use chrono::{DateTime, Utc};
use comrak::{Options, markdown_to_html};
use thiserror::Error;
use tracing::instrument;

use bluefitt_core::models::collections;
use bluefitt_core::normalize;
use bluefitt_core::store::{DocumentStore, StoreError};
use bluefitt_core::{Fetch, FieldValue, Post, PostSlug, UserUid};

/// Attempts at finding a free slug before giving up.
const MAX_SLUG_SUFFIX: usize = 20;

/// Errors creating a post.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("title is required")]
    MissingTitle,

    #[error("content is required")]
    MissingContent,

    #[error("no free slug for title")]
    SlugTaken,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl BlogError {
    /// Short code used in `?error=` query parameters.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingTitle => "missing-title",
            Self::MissingContent => "missing-content",
            Self::SlugTaken => "slug-taken",
            Self::Store(StoreError::PermissionDenied(_)) => "permission-denied",
            Self::Store(_) => "store-failed",
        }
    }
}

/// Localized message for a [`BlogError::code`].
#[must_use]
pub fn error_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "missing-title" => "El título es obligatorio.",
        "missing-content" => "El contenido es obligatorio.",
        "slug-taken" => "Ya existe una publicación con un título similar.",
        "permission-denied" => "No tienes permisos para publicar.",
        "store-failed" => "No se pudo guardar la publicación. Inténtalo de nuevo.",
        _ => return None,
    })
}

/// A post as submitted from the new-post form.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image: Option<String>,
    /// Comma-separated.
    pub tags: String,
    pub published: bool,
}

/// List published posts, newest first.
#[instrument(skip(store))]
pub async fn posts<S: DocumentStore>(store: &S) -> Fetch<Vec<Post>> {
    let now = Utc::now();
    Fetch::from_result(store.list(collections::POSTS, None).await).map(|docs| {
        let mut posts: Vec<Post> = docs
            .iter()
            .map(|doc| Post::from_document(doc, now))
            .filter(|post| post.published)
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    })
}

/// Look up one post by slug. A missing document is not an error.
#[instrument(skip(store))]
pub async fn post<S: DocumentStore>(store: &S, slug: &str) -> Fetch<Post> {
    let now = Utc::now();
    Fetch::from_lookup(store.get(collections::POSTS, slug).await)
        .map(|doc| Post::from_document(&doc, now))
}

/// Create a post authored by `author`. Returns the slug it was stored under.
///
/// The slug is derived from the title; `-2`, `-3`, ... is appended when the
/// slug is already taken.
///
/// # Errors
///
/// Returns a validation error for a blank title or body, or the store error.
#[instrument(skip(store, new_post), fields(title = %new_post.title))]
pub async fn create_post<S: DocumentStore>(
    store: &S,
    author_uid: &UserUid,
    author_name: &str,
    new_post: NewPost,
    now: DateTime<Utc>,
) -> Result<PostSlug, BlogError> {
    let title = new_post.title.trim().to_owned();
    if title.is_empty() {
        return Err(BlogError::MissingTitle);
    }
    if new_post.content.trim().is_empty() {
        return Err(BlogError::MissingContent);
    }

    let base = PostSlug::from_title(&title);
    let base = if base.is_empty() {
        PostSlug::new(format!("post-{}", now.timestamp()))
    } else {
        base
    };
    let slug = free_slug(store, &base).await?;

    let post = Post {
        slug: slug.clone(),
        title,
        excerpt: new_post.excerpt.trim().to_owned(),
        content: new_post.content,
        cover_image: new_post
            .cover_image
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty()),
        tags: normalize::split_joined(&new_post.tags),
        author_uid: author_uid.clone(),
        author_name: author_name.to_owned(),
        published: new_post.published,
        created_at: now,
    };

    let mut fields = post.to_fields();
    fields.insert("slug".to_owned(), FieldValue::from(slug.as_str()));
    store.set(collections::POSTS, slug.as_str(), fields).await?;

    tracing::info!(slug = %slug, "Post created");
    Ok(slug)
}

async fn free_slug<S: DocumentStore>(store: &S, base: &PostSlug) -> Result<PostSlug, BlogError> {
    if store.get(collections::POSTS, base.as_str()).await?.is_none() {
        return Ok(base.clone());
    }
    for n in 2..=MAX_SLUG_SUFFIX {
        let candidate = PostSlug::new(format!("{base}-{n}"));
        if store.get(collections::POSTS, candidate.as_str()).await?.is_none() {
            return Ok(candidate);
        }
    }
    Err(BlogError::SlugTaken)
}

/// Render a post body to HTML.
#[must_use]
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    // GitHub-flavored extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;

    markdown_to_html(content, &options)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bluefitt_core::Fields;
    use bluefitt_core::store::MemoryStore;

    use super::*;

    fn new_post(title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            excerpt: String::new(),
            content: "Primer **párrafo**.".to_string(),
            cover_image: Some("  ".to_string()),
            tags: "riego, goteo,".to_string(),
            published: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let store = MemoryStore::new();
        let author = UserUid::new("u1");
        let slug = create_post(&store, &author, "Ana", new_post("Riego por goteo"), Utc::now())
            .await
            .unwrap();
        assert_eq!(slug.as_str(), "riego-por-goteo");

        let post = post(&store, slug.as_str()).await.data.unwrap();
        assert_eq!(post.tags, vec!["riego", "goteo"]);
        assert_eq!(post.author_name, "Ana");
        assert!(post.cover_image.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_titles_get_suffixes() {
        let store = MemoryStore::new();
        let author = UserUid::new("u1");
        for expected in ["riego", "riego-2", "riego-3"] {
            let slug = create_post(&store, &author, "Ana", new_post("Riego"), Utc::now())
                .await
                .unwrap();
            assert_eq!(slug.as_str(), expected);
        }
    }

    #[tokio::test]
    async fn test_validation() {
        let store = MemoryStore::new();
        let author = UserUid::new("u1");

        let err = create_post(&store, &author, "Ana", new_post("   "), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "missing-title");

        let mut empty = new_post("Título");
        empty.content = "\n".to_string();
        let err = create_post(&store, &author, "Ana", empty, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "missing-content");
        assert!(store.commit_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_posts_hide_drafts_and_sort_newest_first() {
        let store = MemoryStore::new();
        let mut old = Fields::new();
        old.insert("title".to_string(), FieldValue::from("Antiguo"));
        old.insert("createdAt".to_string(), FieldValue::from("2024-01-01T00:00:00Z"));
        store.insert(collections::POSTS, "antiguo", old);

        let mut new = Fields::new();
        new.insert("title".to_string(), FieldValue::from("Nuevo"));
        new.insert("createdAt".to_string(), FieldValue::from("2025-01-01T00:00:00Z"));
        store.insert(collections::POSTS, "nuevo", new);

        let mut draft = Fields::new();
        draft.insert("title".to_string(), FieldValue::from("Borrador"));
        draft.insert("published".to_string(), FieldValue::Bool(false));
        store.insert(collections::POSTS, "borrador", draft);

        let titles: Vec<String> = posts(&store)
            .await
            .data
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Nuevo", "Antiguo"]);
    }

    #[tokio::test]
    async fn test_missing_post() {
        assert_eq!(post(&MemoryStore::new(), "nada").await, Fetch::missing());
    }

    #[test]
    fn test_markdown_escapes_raw_html() {
        let html = render_markdown("~~viejo~~ <script>alert(1)</script>");
        assert!(html.contains("<del>viejo</del>"));
        assert!(!html.contains("<script>"));
    }
}
