//! Session identity provider.
//!
//! [`IdentityProvider`] wraps the Identity Toolkit client and the Firestore
//! profile documents. It is built once at startup and owned by
//! [`AppState`](crate::state::AppState). Every identity change is published
//! on a broadcast channel; [`spawn_audit_log`] subscribes and logs them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::broadcast;
use tower_sessions::Session;
use tracing::instrument;

use bluefitt_core::models::collections;
use bluefitt_core::store::{DocumentStore, StoreError};
use bluefitt_core::{AppUser, Email, EmailError, FieldValue, Fields, UserRole, UserUid};

use crate::config::FirebaseConfig;
use crate::firebase::{AuthErrorCode, FirebaseError, FirestoreClient, FirestoreStore, IdentityClient, TokenGrant};
use crate::models::{CurrentUser, session_keys};
use crate::services::directory;

/// Capacity of the identity event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Identity change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    SignedIn { uid: UserUid, email: String },
    Registered { uid: UserUid, email: String },
    SignedOut { uid: UserUid },
    ProfileUpdated { uid: UserUid },
    AccountDeleted { uid: UserUid },
}

/// Errors from identity operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Firebase is not configured; nothing can be done.
    #[error("authentication backend is disabled: {0}")]
    BackendDisabled(String),

    /// The identity service rejected the request.
    #[error("identity service error: {0}")]
    Provider(AuthErrorCode),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("display name is required")]
    MissingDisplayName,

    /// No identity in the session.
    #[error("not signed in")]
    NotSignedIn,

    #[error("firebase error: {0}")]
    Firebase(FirebaseError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<FirebaseError> for AuthError {
    fn from(err: FirebaseError) -> Self {
        match crate::firebase::auth::error_code(&err) {
            Some(code) => Self::Provider(code),
            None => Self::Firebase(err),
        }
    }
}

impl AuthError {
    /// Short code used in `?error=` query parameters.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BackendDisabled(_) => "backend-disabled",
            Self::Provider(code) => code.as_str(),
            Self::InvalidEmail(_) => "invalid-email",
            Self::MissingDisplayName => "missing-name",
            Self::NotSignedIn => "not-signed-in",
            Self::Store(StoreError::PermissionDenied(_)) => "permission-denied",
            Self::Firebase(_) | Self::Store(_) | Self::Session(_) => "auth-failed",
        }
    }

    /// Whether the session should be treated as signed out.
    #[must_use]
    pub const fn ends_session(&self) -> bool {
        match self {
            Self::Provider(code) => code.invalidates_session(),
            Self::NotSignedIn => true,
            _ => false,
        }
    }
}

/// Localized message for an [`AuthError::code`].
#[must_use]
pub fn error_message(code: &str) -> Option<&'static str> {
    match code {
        "backend-disabled" => Some(
            "El servicio de autenticación no está configurado. Contacta al administrador.",
        ),
        "missing-name" => Some("El nombre es obligatorio."),
        "not-signed-in" => Some("Debes iniciar sesión para continuar."),
        "permission-denied" => Some("No tienes permisos para realizar esta acción."),
        other => AuthErrorCode::from_slug(other).map(AuthErrorCode::message),
    }
}

#[derive(Clone)]
struct Backend {
    identity: IdentityClient,
    firestore: FirestoreClient,
}

/// Session identity provider.
#[derive(Clone)]
pub struct IdentityProvider {
    inner: Arc<IdentityProviderInner>,
}

struct IdentityProviderInner {
    backend: Option<Backend>,
    disabled_reason: String,
    events: broadcast::Sender<IdentityEvent>,
}

impl IdentityProvider {
    /// Build the provider for a configured Firebase project.
    ///
    /// # Errors
    ///
    /// Returns an error if a Firebase client cannot be built.
    pub fn new(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        let backend = Backend {
            identity: IdentityClient::new(config)?,
            firestore: FirestoreClient::new(config)?,
        };
        Ok(Self::build(Some(backend), String::new()))
    }

    /// Build a provider whose every operation fails with
    /// [`AuthError::BackendDisabled`].
    #[must_use]
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::build(None, reason.into())
    }

    fn build(backend: Option<Backend>, disabled_reason: String) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(IdentityProviderInner {
                backend,
                disabled_reason,
                events,
            }),
        }
    }

    /// Whether sign-in is possible at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Subscribe to identity change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.inner.events.subscribe()
    }

    fn backend(&self) -> Result<&Backend, AuthError> {
        self.inner
            .backend
            .as_ref()
            .ok_or_else(|| AuthError::BackendDisabled(self.inner.disabled_reason.clone()))
    }

    fn publish(&self, event: IdentityEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    // =========================================================================
    // Session Identity
    // =========================================================================

    /// The identity stored in the session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn current(session: &Session) -> Result<Option<CurrentUser>, AuthError> {
        Ok(session.get::<CurrentUser>(session_keys::CURRENT_USER).await?)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] when the credentials are rejected.
    #[instrument(skip(self, session, password))]
    pub async fn login(
        &self,
        session: &Session,
        email: &str,
        password: &str,
    ) -> Result<CurrentUser, AuthError> {
        let backend = self.backend()?;
        let email = Email::parse(email)?;

        let grant = backend
            .identity
            .sign_in_with_password(email.as_str(), password)
            .await?;
        let store = backend.firestore.as_user(reissue(&grant.id_token));
        let now = Utc::now();
        let profile = load_profile(&store, &grant, now).await?;

        let user = session_user(&profile, grant, now);
        start_session(session, &user).await?;

        self.publish(IdentityEvent::SignedIn {
            uid: user.uid.clone(),
            email: user.email.clone(),
        });
        Ok(user)
    }

    /// Create an account and its `users/{uid}` profile with role `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] when the account cannot be created.
    #[instrument(skip(self, session, password))]
    pub async fn register(
        &self,
        session: &Session,
        email: &str,
        password: &str,
        display_name: &str,
        company: Option<&str>,
    ) -> Result<CurrentUser, AuthError> {
        let backend = self.backend()?;
        let email = Email::parse(email)?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AuthError::MissingDisplayName);
        }

        let grant = backend.identity.sign_up(email.as_str(), password).await?;
        backend
            .identity
            .update_profile(&grant.id_token, display_name)
            .await?;

        let now = Utc::now();
        let profile = AppUser {
            uid: UserUid::new(grant.uid.clone()),
            email: email.into_inner(),
            display_name: display_name.to_owned(),
            role: UserRole::User,
            company: company.map(str::trim).filter(|c| !c.is_empty()).map(str::to_owned),
            created_at: now,
            photo_url: None,
        };
        let store = backend.firestore.as_user(reissue(&grant.id_token));
        store
            .set(collections::USERS, profile.uid.as_str(), profile.to_fields())
            .await?;

        let user = session_user(&profile, grant, now);
        start_session(session, &user).await?;

        self.publish(IdentityEvent::Registered {
            uid: user.uid.clone(),
            email: user.email.clone(),
        });
        Ok(user)
    }

    /// Clear the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    #[instrument(skip(self, session))]
    pub async fn logout(&self, session: &Session) -> Result<(), AuthError> {
        let current = Self::current(session).await?;
        session.flush().await?;

        if let Some(user) = current {
            self.publish(IdentityEvent::SignedOut { uid: user.uid });
        }
        Ok(())
    }

    /// The session identity with a usable ID token, refreshing it if expired.
    ///
    /// When the refresh token has been revoked the session is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] without a session identity, or the
    /// refresh failure.
    #[instrument(skip(self, session))]
    pub async fn fresh_token(&self, session: &Session) -> Result<CurrentUser, AuthError> {
        let backend = self.backend()?;
        let mut user = Self::current(session).await?.ok_or(AuthError::NotSignedIn)?;

        let now = Utc::now();
        if !user.token_expired(now) {
            return Ok(user);
        }

        match backend.identity.refresh(&user.refresh_token()).await {
            Ok(grant) => {
                user.renew(
                    grant.id_token.expose_secret().to_owned(),
                    grant.refresh_token.expose_secret().to_owned(),
                    grant.expires_in,
                    now,
                );
                session.insert(session_keys::CURRENT_USER, &user).await?;
                tracing::debug!(uid = %user.uid, "ID token refreshed");
                Ok(user)
            }
            Err(e) => {
                let err = AuthError::from(e);
                if err.ends_session() {
                    session.flush().await?;
                }
                Err(err)
            }
        }
    }

    /// A Firestore handle acting as the signed-in user.
    ///
    /// # Errors
    ///
    /// See [`fresh_token`](Self::fresh_token).
    pub async fn user_store(&self, session: &Session) -> Result<(CurrentUser, FirestoreStore), AuthError> {
        let user = self.fresh_token(session).await?;
        let store = self.backend()?.firestore.as_user(user.id_token());
        Ok((user, store))
    }

    /// A Firestore handle with no credentials, for publicly readable data.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::BackendDisabled`] when Firebase is not configured.
    pub fn public_store(&self) -> Result<FirestoreStore, AuthError> {
        Ok(self.backend()?.firestore.anonymous())
    }

    /// Update the display name on the identity and the profile document.
    ///
    /// # Errors
    ///
    /// Returns an error if either update fails.
    #[instrument(skip(self, session))]
    pub async fn update_profile(
        &self,
        session: &Session,
        display_name: &str,
        company: Option<&str>,
    ) -> Result<CurrentUser, AuthError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AuthError::MissingDisplayName);
        }
        let company = company.map(str::trim).filter(|c| !c.is_empty());

        let (mut user, store) = self.user_store(session).await?;
        self.backend()?
            .identity
            .update_profile(&user.id_token(), display_name)
            .await?;
        save_profile_fields(&store, &user, display_name, company).await?;

        display_name.clone_into(&mut user.display_name);
        user.company = company.map(str::to_owned);
        session.insert(session_keys::CURRENT_USER, &user).await?;

        self.publish(IdentityEvent::ProfileUpdated { uid: user.uid.clone() });
        Ok(user)
    }

    /// Delete the identity account, then its profile document.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity deletion fails; a failure deleting the
    /// profile document afterwards is only logged.
    #[instrument(skip(self, session))]
    pub async fn delete_account(&self, session: &Session) -> Result<(), AuthError> {
        let (user, store) = self.user_store(session).await?;
        self.backend()?
            .identity
            .delete_account(&user.id_token())
            .await?;

        if let Err(e) = store.delete(collections::USERS, user.uid.as_str()).await {
            tracing::warn!(uid = %user.uid, error = %e, "Profile document not deleted with account");
        }
        session.flush().await?;

        self.publish(IdentityEvent::AccountDeleted { uid: user.uid });
        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Read the signed-in user's profile. A missing profile means role `user`.
async fn load_profile<S: DocumentStore>(
    store: &S,
    grant: &TokenGrant,
    now: DateTime<Utc>,
) -> Result<AppUser, StoreError> {
    let uid = UserUid::new(grant.uid.clone());
    let profile = directory::profile(store, &uid).await?;

    Ok(profile.map_or_else(
        || AppUser {
            uid,
            email: grant.email.clone(),
            display_name: grant.display_name.clone().unwrap_or_default(),
            role: UserRole::User,
            company: None,
            created_at: now,
            photo_url: None,
        },
        |mut profile| {
            if profile.email.is_empty() {
                profile.email.clone_from(&grant.email);
            }
            profile
        },
    ))
}

/// Write `displayName` and `company`, creating the profile if it is missing.
async fn save_profile_fields<S: DocumentStore>(
    store: &S,
    user: &CurrentUser,
    display_name: &str,
    company: Option<&str>,
) -> Result<(), StoreError> {
    let mut fields = Fields::new();
    fields.insert("displayName".to_owned(), FieldValue::from(display_name));
    fields.insert("company".to_owned(), FieldValue::from(company.map(str::to_owned)));

    match store.update(collections::USERS, user.uid.as_str(), fields).await {
        Err(StoreError::Rejected(_)) => {
            let profile = AppUser {
                uid: user.uid.clone(),
                email: user.email.clone(),
                display_name: display_name.to_owned(),
                role: user.role,
                company: company.map(str::to_owned),
                created_at: Utc::now(),
                photo_url: None,
            };
            store
                .set(collections::USERS, user.uid.as_str(), profile.to_fields())
                .await
        }
        other => other,
    }
}

fn reissue(token: &SecretString) -> SecretString {
    SecretString::from(token.expose_secret().to_owned())
}

fn session_user(profile: &AppUser, grant: TokenGrant, now: DateTime<Utc>) -> CurrentUser {
    CurrentUser::new(
        profile,
        grant.id_token.expose_secret().to_owned(),
        grant.refresh_token.expose_secret().to_owned(),
        grant.expires_in,
        now,
    )
}

async fn start_session(session: &Session, user: &CurrentUser) -> Result<(), AuthError> {
    // New id on privilege change
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    Ok(())
}

/// Log every identity event until the provider is dropped.
pub fn spawn_audit_log(provider: &IdentityProvider) -> tokio::task::JoinHandle<()> {
    let mut events = provider.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Identity audit log lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &IdentityEvent) {
    match event {
        IdentityEvent::SignedIn { uid, email } => {
            tracing::info!(uid = %uid, email = %email, "User signed in");
        }
        IdentityEvent::Registered { uid, email } => {
            tracing::info!(uid = %uid, email = %email, "User registered");
        }
        IdentityEvent::SignedOut { uid } => tracing::info!(uid = %uid, "User signed out"),
        IdentityEvent::ProfileUpdated { uid } => tracing::info!(uid = %uid, "Profile updated"),
        IdentityEvent::AccountDeleted { uid } => tracing::info!(uid = %uid, "Account deleted"),
    }
}
