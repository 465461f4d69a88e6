//! Blog post record.

use chrono::{DateTime, Utc};

use crate::document::{Fields, RawDocument};
use crate::normalize;
use crate::types::{PostSlug, UserUid};

/// A blog post stored at `posts/{slug}`. `content` is markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub slug: PostSlug,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub tags: Vec<String>,
    pub author_uid: UserUid,
    pub author_name: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Build a post from a stored document.
    #[must_use]
    pub fn from_document(doc: &RawDocument, now: DateTime<Utc>) -> Self {
        Self {
            slug: PostSlug::new(doc.id.clone()),
            title: normalize::text(doc.get("title")),
            excerpt: normalize::text(doc.get("excerpt")),
            content: normalize::text(doc.get("content")),
            cover_image: normalize::optional_text(doc.get("coverImage")),
            tags: normalize::string_list(doc.get("tags")),
            author_uid: UserUid::new(normalize::text(doc.get("authorUid"))),
            author_name: normalize::text(doc.get("authorName")),
            published: normalize::bool_or(doc.get("published"), true),
            created_at: normalize::timestamp_or(doc.get("createdAt"), now),
        }
    }

    /// Encode as document fields.
    #[must_use]
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".to_owned(), self.title.clone().into());
        fields.insert("excerpt".to_owned(), self.excerpt.clone().into());
        fields.insert("content".to_owned(), self.content.clone().into());
        fields.insert("coverImage".to_owned(), self.cover_image.clone().into());
        fields.insert("tags".to_owned(), self.tags.clone().into());
        fields.insert("authorUid".to_owned(), self.author_uid.as_str().into());
        fields.insert("authorName".to_owned(), self.author_name.clone().into());
        fields.insert("published".to_owned(), self.published.into());
        fields.insert("createdAt".to_owned(), self.created_at.into());
        fields
    }

    /// Excerpt if set, else the first paragraph of the content, capped at 200 chars.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.excerpt.is_empty() {
            return self.excerpt.clone();
        }
        let first = self
            .content
            .split("\n\n")
            .map(str::trim)
            .find(|p| !p.is_empty() && !p.starts_with('#'))
            .unwrap_or_default();
        first.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;

    #[test]
    fn test_tags_accept_joined_string() {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), FieldValue::from("Riego"));
        fields.insert("tags".to_string(), FieldValue::from("riego, goteo"));
        let post = Post::from_document(&RawDocument::new("riego", fields), Utc::now());
        assert_eq!(post.tags, vec!["riego", "goteo"]);
        assert!(post.published);
    }

    #[test]
    fn test_summary_skips_headings() {
        let mut fields = Fields::new();
        fields.insert(
            "content".to_string(),
            FieldValue::from("# Título\n\nPrimer párrafo.\n\nSegundo."),
        );
        let post = Post::from_document(&RawDocument::new("p", fields), Utc::now());
        assert_eq!(post.summary(), "Primer párrafo.");
    }
}
