//! User profile record.

use chrono::{DateTime, Utc};

use crate::document::{Fields, RawDocument};
use crate::normalize;
use crate::types::{UserRole, UserUid};

/// A user profile stored at `users/{uid}`.
///
/// The profile is separate from the identity held by the authentication
/// service; removing one does not remove the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUser {
    pub uid: UserUid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
    pub photo_url: Option<String>,
}

impl AppUser {
    /// Build a profile from a stored document. Unknown roles read as `user`.
    #[must_use]
    pub fn from_document(doc: &RawDocument, now: DateTime<Utc>) -> Self {
        let uid = normalize::optional_text(doc.get("uid")).unwrap_or_else(|| doc.id.clone());

        Self {
            uid: UserUid::new(uid),
            email: normalize::text(doc.get("email")),
            display_name: normalize::text(doc.get("displayName")),
            role: UserRole::parse_lenient(&normalize::text(doc.get("role"))),
            company: normalize::optional_text(doc.get("company")),
            created_at: normalize::timestamp_or(doc.get("createdAt"), now),
            photo_url: normalize::optional_text(doc.get_any(&["photoURL", "photoUrl"])),
        }
    }

    /// Encode as document fields.
    #[must_use]
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("uid".to_owned(), self.uid.as_str().into());
        fields.insert("email".to_owned(), self.email.clone().into());
        fields.insert("displayName".to_owned(), self.display_name.clone().into());
        fields.insert("role".to_owned(), self.role.as_str().into());
        fields.insert("company".to_owned(), self.company.clone().into());
        fields.insert("createdAt".to_owned(), self.created_at.into());
        fields.insert("photoURL".to_owned(), self.photo_url.clone().into());
        fields
    }

    /// Name to show in lists: display name, else the email's local part.
    #[must_use]
    pub fn shown_name(&self) -> &str {
        if self.display_name.is_empty() {
            self.email.split('@').next().unwrap_or_default()
        } else {
            &self.display_name
        }
    }

    /// Whether the profile has the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::FieldValue;

    #[test]
    fn test_profile_defaults() {
        let now = Utc::now();
        let mut fields = Fields::new();
        fields.insert("email".to_string(), FieldValue::from("ana@bluefitt.cl"));
        fields.insert("role".to_string(), FieldValue::from("owner"));
        let user = AppUser::from_document(&RawDocument::new("u1", fields), now);

        assert_eq!(user.uid.as_str(), "u1");
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.shown_name(), "ana");
        assert_eq!(user.created_at, now);
        assert!(user.company.is_none());
    }

    #[test]
    fn test_profile_fields_read_back() {
        let now = Utc::now();
        let user = AppUser {
            uid: UserUid::new("u2"),
            email: "jefe@bluefitt.cl".to_string(),
            display_name: "Jefa".to_string(),
            role: UserRole::Admin,
            company: Some("Bluefitt".to_string()),
            created_at: now,
            photo_url: None,
        };
        let reread = AppUser::from_document(&RawDocument::new("u2", user.to_fields()), now);
        assert_eq!(reread, user);
        assert!(reread.is_admin());
    }
}
