//! User directory: profile documents under `users/`.

use chrono::Utc;
use tracing::instrument;

use bluefitt_core::models::collections;
use bluefitt_core::policy::{self, RoleChange, RoleChangeError, UserRemovalError};
use bluefitt_core::store::{DocumentStore, StoreError};
use bluefitt_core::{AppUser, Fetch, FieldValue, Fields, UserRole, UserUid};
use thiserror::Error;

/// Errors from user administration actions.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    RoleChange(#[from] RoleChangeError),

    #[error(transparent)]
    Removal(#[from] UserRemovalError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DirectoryError {
    /// Short code used in `?error=` query parameters.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::RoleChange(RoleChangeError::NotAdmin) | Self::Removal(UserRemovalError::NotAdmin) => {
                "not-admin"
            }
            Self::RoleChange(RoleChangeError::SelfDemotion) => "self-demotion",
            Self::RoleChange(RoleChangeError::LastAdmin) | Self::Removal(UserRemovalError::LastAdmin) => {
                "last-admin"
            }
            Self::Removal(UserRemovalError::SelfRemoval) => "self-removal",
            Self::RoleChange(RoleChangeError::UnknownUser(_))
            | Self::Removal(UserRemovalError::UnknownUser(_)) => "unknown-user",
            Self::Store(StoreError::PermissionDenied(_)) => "permission-denied",
            Self::Store(_) => "store-failed",
        }
    }
}

/// Localized message for a [`DirectoryError::code`].
#[must_use]
pub fn error_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "not-admin" => "Tu cuenta ya no tiene rol de administrador.",
        "self-demotion" => "No puedes quitarte el rol de administrador.",
        "last-admin" => "Debe quedar al menos un administrador.",
        "self-removal" => "No puedes eliminar tu propio perfil desde aquí.",
        "unknown-user" => "El usuario ya no existe.",
        "permission-denied" => "No tienes permisos para realizar esta acción.",
        "store-failed" => "No se pudo guardar el cambio. Inténtalo de nuevo.",
        _ => return None,
    })
}

/// List every user profile, ordered by email.
#[instrument(skip(store))]
pub async fn users<S: DocumentStore>(store: &S) -> Fetch<Vec<AppUser>> {
    let now = Utc::now();
    Fetch::from_result(store.list(collections::USERS, None).await).map(|docs| {
        let mut users: Vec<AppUser> = docs
            .iter()
            .map(|doc| AppUser::from_document(doc, now))
            .collect();
        users.sort_by(|a, b| a.email.to_lowercase().cmp(&b.email.to_lowercase()));
        users
    })
}

/// Read one profile. `Ok(None)` when the user has no profile document.
///
/// # Errors
///
/// Returns the store error if the read fails.
pub async fn profile<S: DocumentStore>(store: &S, uid: &UserUid) -> Result<Option<AppUser>, StoreError> {
    let now = Utc::now();
    Ok(store
        .get(collections::USERS, uid.as_str())
        .await?
        .map(|doc| AppUser::from_document(&doc, now)))
}

/// Change `target`'s role on behalf of `actor`.
///
/// The policy check runs against a fresh read of all users before any write.
///
/// # Errors
///
/// Returns a policy error when the change is not allowed, or the store error.
#[instrument(skip(store))]
pub async fn change_role<S: DocumentStore>(
    store: &S,
    actor: &UserUid,
    target: &UserUid,
    new_role: UserRole,
) -> Result<RoleChange, DirectoryError> {
    let now = Utc::now();
    let users: Vec<AppUser> = store
        .list(collections::USERS, None)
        .await?
        .iter()
        .map(|doc| AppUser::from_document(doc, now))
        .collect();

    let change = policy::check_role_change(actor, target, new_role, &users)?;
    if change == RoleChange::Apply {
        let mut fields = Fields::new();
        fields.insert("role".to_owned(), FieldValue::from(new_role.as_str()));
        store.update(collections::USERS, target.as_str(), fields).await?;
        tracing::info!(target_uid = %target, role = %new_role, "User role changed");
    }
    Ok(change)
}

/// Delete `target`'s profile document. The identity account is untouched.
///
/// # Errors
///
/// Returns a policy error when the removal is not allowed, or the store error.
#[instrument(skip(store))]
pub async fn remove_profile<S: DocumentStore>(
    store: &S,
    actor: &UserUid,
    target: &UserUid,
) -> Result<(), DirectoryError> {
    let now = Utc::now();
    let users: Vec<AppUser> = store
        .list(collections::USERS, None)
        .await?
        .iter()
        .map(|doc| AppUser::from_document(doc, now))
        .collect();

    policy::check_user_removal(actor, target, &users)?;
    store.delete(collections::USERS, target.as_str()).await?;
    tracing::info!(target_uid = %target, "User profile deleted");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bluefitt_core::store::MemoryStore;

    use super::*;

    fn seed(store: &MemoryStore, uid: &str, email: &str, role: UserRole) {
        let mut fields = Fields::new();
        fields.insert("email".to_string(), FieldValue::from(email));
        fields.insert("role".to_string(), FieldValue::from(role.as_str()));
        store.insert(collections::USERS, uid, fields);
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        seed(&store, "admin", "jefa@bluefitt.cl", UserRole::Admin);
        seed(&store, "ed", "Editor@bluefitt.cl", UserRole::Editor);
        seed(&store, "viewer", "ana@bluefitt.cl", UserRole::User);
        store
    }

    #[tokio::test]
    async fn test_users_sorted_by_email() {
        let fetch = users(&store()).await;
        let emails: Vec<String> = fetch.data.unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(
            emails,
            vec!["ana@bluefitt.cl", "Editor@bluefitt.cl", "jefa@bluefitt.cl"]
        );
    }

    #[tokio::test]
    async fn test_sole_admin_cannot_demote_self() {
        let store = store();
        let admin = UserUid::new("admin");
        let result = change_role(&store, &admin, &admin, UserRole::User).await;

        assert!(matches!(
            result,
            Err(DirectoryError::RoleChange(RoleChangeError::SelfDemotion))
        ));
        assert!(store.commit_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_demoted_admin_cannot_promote_self_or_remove_users() {
        let store = store();
        let editor = UserUid::new("ed");

        let promote = change_role(&store, &editor, &editor, UserRole::Admin).await;
        assert_eq!(promote.unwrap_err().code(), "not-admin");

        let remove = remove_profile(&store, &editor, &UserUid::new("viewer")).await;
        assert_eq!(remove.unwrap_err().code(), "not-admin");

        assert!(store.commit_sizes().is_empty());
        assert_eq!(store.count(collections::USERS), 3);
    }

    #[tokio::test]
    async fn test_promote_then_demote_other_admin() {
        let store = store();
        let admin = UserUid::new("admin");
        let editor = UserUid::new("ed");

        let change = change_role(&store, &admin, &editor, UserRole::Admin).await.unwrap();
        assert_eq!(change, RoleChange::Apply);
        let promoted = profile(&store, &editor).await.unwrap().unwrap();
        assert_eq!(promoted.role, UserRole::Admin);

        change_role(&store, &editor, &admin, UserRole::Editor).await.unwrap();
        let demoted = profile(&store, &admin).await.unwrap().unwrap();
        assert_eq!(demoted.role, UserRole::Editor);
    }

    #[tokio::test]
    async fn test_unchanged_role_writes_nothing() {
        let store = store();
        let change = change_role(&store, &UserUid::new("admin"), &UserUid::new("viewer"), UserRole::User)
            .await
            .unwrap();
        assert_eq!(change, RoleChange::Unchanged);
        assert!(store.commit_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_remove_profile() {
        let store = store();
        let admin = UserUid::new("admin");

        let own = remove_profile(&store, &admin, &admin).await;
        assert_eq!(own.unwrap_err().code(), "self-removal");

        remove_profile(&store, &admin, &UserUid::new("viewer")).await.unwrap();
        assert_eq!(store.count(collections::USERS), 2);
        assert!(profile(&store, &UserUid::new("viewer")).await.unwrap().is_none());
    }

    #[test]
    fn test_error_codes_have_messages() {
        for code in ["not-admin", "self-demotion", "last-admin", "self-removal", "unknown-user", "store-failed"] {
            assert!(error_message(code).is_some(), "{code}");
        }
        assert!(error_message("other").is_none());
    }
}
