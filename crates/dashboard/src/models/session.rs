//! Session-related types.
//!
//! Types stored in the session for authentication state.

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use bluefitt_core::guard::IdentityState;
use bluefitt_core::{AppUser, UserRole, UserUid};

/// Refresh ID tokens this long before they actually expire.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Session-stored user identity.
///
/// Holds the profile fields the dashboard renders on every page plus the
/// Firebase tokens used to act as this user against Firestore.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: UserUid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub company: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .field("company", &self.company)
            .field("tokens", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CurrentUser {
    /// Build the session identity from a profile and freshly issued tokens.
    #[must_use]
    pub fn new(
        profile: &AppUser,
        id_token: String,
        refresh_token: String,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: profile.uid.clone(),
            email: profile.email.clone(),
            display_name: profile.shown_name().to_owned(),
            role: profile.role,
            company: profile.company.clone(),
            id_token,
            refresh_token,
            expires_at: now + Duration::seconds(expires_in),
        }
    }

    /// Replace the tokens after a refresh.
    pub fn renew(&mut self, id_token: String, refresh_token: String, expires_in: i64, now: DateTime<Utc>) {
        self.id_token = id_token;
        self.refresh_token = refresh_token;
        self.expires_at = now + Duration::seconds(expires_in);
    }

    /// Whether the ID token should be refreshed before use.
    #[must_use]
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECONDS) >= self.expires_at
    }

    #[must_use]
    pub fn id_token(&self) -> SecretString {
        SecretString::from(self.id_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> SecretString {
        SecretString::from(self.refresh_token.clone())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Guard input for this identity.
    #[must_use]
    pub const fn identity_state(&self) -> IdentityState {
        IdentityState::SignedIn(self.role)
    }

    /// Initials for the avatar badge.
    #[must_use]
    pub fn initials(&self) -> String {
        let initials: String = self
            .display_name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect();
        if initials.is_empty() {
            "?".to_string()
        } else {
            initials
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";
}
