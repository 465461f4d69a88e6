//! Identity Toolkit and Secure Token REST client.
//!
//! Handles email/password sign-in and sign-up, profile updates, account
//! deletion and ID token refresh. Every call is a single attempt.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::{FirebaseError, http_client, read_json};
use crate::config::FirebaseConfig;

const IDENTITY_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1/";
const SECURE_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1/";

/// Error codes reported by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    EmailExists,
    EmailNotFound,
    InvalidPassword,
    InvalidCredentials,
    InvalidEmail,
    MissingPassword,
    WeakPassword,
    UserDisabled,
    UserNotFound,
    TooManyAttempts,
    TokenExpired,
    InvalidToken,
    RequiresRecentLogin,
    OperationNotAllowed,
    Unknown,
}

impl AuthErrorCode {
    const ALL: [Self; 15] = [
        Self::EmailExists,
        Self::EmailNotFound,
        Self::InvalidPassword,
        Self::InvalidCredentials,
        Self::InvalidEmail,
        Self::MissingPassword,
        Self::WeakPassword,
        Self::UserDisabled,
        Self::UserNotFound,
        Self::TooManyAttempts,
        Self::TokenExpired,
        Self::InvalidToken,
        Self::RequiresRecentLogin,
        Self::OperationNotAllowed,
        Self::Unknown,
    ];

    /// Look up a code by its [`as_str`](Self::as_str) slug.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == slug)
    }

    /// Parse the `message` of an Identity Toolkit error body.
    ///
    /// Messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should
    /// be at least 6 characters`.
    #[must_use]
    pub fn from_api_message(message: &str) -> Self {
        let code = message.split(" : ").next().unwrap_or_default().trim();
        match code {
            "EMAIL_EXISTS" => Self::EmailExists,
            "EMAIL_NOT_FOUND" => Self::EmailNotFound,
            "INVALID_PASSWORD" => Self::InvalidPassword,
            "INVALID_LOGIN_CREDENTIALS" => Self::InvalidCredentials,
            "INVALID_EMAIL" => Self::InvalidEmail,
            "MISSING_PASSWORD" => Self::MissingPassword,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "USER_DISABLED" => Self::UserDisabled,
            "USER_NOT_FOUND" => Self::UserNotFound,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyAttempts,
            "TOKEN_EXPIRED" => Self::TokenExpired,
            "INVALID_ID_TOKEN" | "INVALID_REFRESH_TOKEN" => Self::InvalidToken,
            "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => Self::RequiresRecentLogin,
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => Self::OperationNotAllowed,
            _ => Self::Unknown,
        }
    }

    /// Short slug used in `?error=` query parameters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailExists => "email-exists",
            Self::EmailNotFound => "email-not-found",
            Self::InvalidPassword => "invalid-password",
            Self::InvalidCredentials => "invalid-credentials",
            Self::InvalidEmail => "invalid-email",
            Self::MissingPassword => "missing-password",
            Self::WeakPassword => "weak-password",
            Self::UserDisabled => "user-disabled",
            Self::UserNotFound => "user-not-found",
            Self::TooManyAttempts => "too-many-attempts",
            Self::TokenExpired => "token-expired",
            Self::InvalidToken => "invalid-token",
            Self::RequiresRecentLogin => "requires-recent-login",
            Self::OperationNotAllowed => "operation-not-allowed",
            Self::Unknown => "auth-failed",
        }
    }

    /// Localized message shown to the user.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::EmailExists => "Ya existe una cuenta con este correo electrónico.",
            Self::EmailNotFound | Self::InvalidPassword | Self::InvalidCredentials => {
                "Correo electrónico o contraseña incorrectos."
            }
            Self::InvalidEmail => "El correo electrónico no es válido.",
            Self::MissingPassword => "Debes ingresar una contraseña.",
            Self::WeakPassword => "La contraseña debe tener al menos 6 caracteres.",
            Self::UserDisabled => "Esta cuenta ha sido deshabilitada.",
            Self::UserNotFound => "No se encontró la cuenta.",
            Self::TooManyAttempts => {
                "Demasiados intentos fallidos. Inténtalo de nuevo más tarde."
            }
            Self::TokenExpired | Self::InvalidToken => {
                "Tu sesión ha expirado. Vuelve a iniciar sesión."
            }
            Self::RequiresRecentLogin => {
                "Por seguridad, vuelve a iniciar sesión antes de continuar."
            }
            Self::OperationNotAllowed => {
                "El inicio de sesión con correo y contraseña no está habilitado."
            }
            Self::Unknown => "No se pudo completar la operación. Inténtalo de nuevo.",
        }
    }

    /// Whether the session's tokens can no longer be used.
    #[must_use]
    pub const fn invalidates_session(self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::InvalidToken | Self::UserDisabled | Self::UserNotFound
        )
    }
}

impl std::fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokens and identity returned by sign-in, sign-up and refresh.
pub struct TokenGrant {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub id_token: SecretString,
    pub refresh_token: SecretString,
    /// Seconds until `id_token` expires.
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

/// Identity Toolkit REST API client.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    identity_endpoint: Url,
    token_endpoint: Url,
    api_key: String,
}

impl IdentityClient {
    /// Create a client, honouring `FIREBASE_AUTH_EMULATOR_HOST`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the emulator
    /// host is not a valid address.
    pub fn new(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        let (identity_endpoint, token_endpoint) = match &config.auth_emulator_host {
            Some(host) => (
                Url::parse(&format!("http://{host}/identitytoolkit.googleapis.com/v1/"))?,
                Url::parse(&format!("http://{host}/securetoken.googleapis.com/v1/"))?,
            ),
            None => (
                Url::parse(IDENTITY_TOOLKIT_ENDPOINT)?,
                Url::parse(SECURE_TOKEN_ENDPOINT)?,
            ),
        };

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client: http_client()?,
                identity_endpoint,
                token_endpoint,
                api_key: config.api_key().to_owned(),
            }),
        })
    }

    fn url(&self, base: &Url, method: &str) -> Result<Url, FirebaseError> {
        let mut url = base.join(method)?;
        url.query_pairs_mut().append_pair("key", &self.inner.api_key);
        Ok(url)
    }

    fn accounts_url(&self, method: &str) -> Result<Url, FirebaseError> {
        self.url(&self.inner.identity_endpoint, &format!("./accounts:{method}"))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::Api`] when the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenGrant, FirebaseError> {
        self.password_call("signInWithPassword", email, password).await
    }

    /// Create an email/password account.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::Api`] when the account cannot be created.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<TokenGrant, FirebaseError> {
        self.password_call("signUp", email, password).await
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<TokenGrant, FirebaseError> {
        let response = self
            .inner
            .client
            .post(self.accounts_url(method)?)
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;
        let body: PasswordResponse = read_json(response).await?;

        Ok(TokenGrant {
            uid: body.local_id,
            email: body.email,
            display_name: body.display_name.filter(|n| !n.is_empty()),
            id_token: SecretString::from(body.id_token),
            refresh_token: SecretString::from(body.refresh_token),
            expires_in: body.expires_in.parse().unwrap_or(0),
        })
    }

    /// Set the account's display name.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::Api`] when the token is invalid.
    #[instrument(skip(self, id_token))]
    pub async fn update_profile(
        &self,
        id_token: &SecretString,
        display_name: &str,
    ) -> Result<(), FirebaseError> {
        let response = self
            .inner
            .client
            .post(self.accounts_url("update")?)
            .json(&UpdateRequest {
                id_token: id_token.expose_secret(),
                display_name,
                return_secure_token: false,
            })
            .send()
            .await?;
        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }

    /// Delete the account owning `id_token`.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::Api`] when the token is invalid or too old.
    #[instrument(skip(self, id_token))]
    pub async fn delete_account(&self, id_token: &SecretString) -> Result<(), FirebaseError> {
        let response = self
            .inner
            .client
            .post(self.accounts_url("delete")?)
            .json(&DeleteRequest {
                id_token: id_token.expose_secret(),
            })
            .send()
            .await?;
        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }

    /// Exchange a refresh token for a new ID token.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::Api`] when the refresh token is revoked.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, FirebaseError> {
        let response = self
            .inner
            .client
            .post(self.url(&self.inner.token_endpoint, "token")?)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .send()
            .await?;
        let body: RefreshResponse = read_json(response).await?;

        Ok(TokenGrant {
            uid: body.user_id,
            email: String::new(),
            display_name: None,
            id_token: SecretString::from(body.id_token),
            refresh_token: SecretString::from(body.refresh_token),
            expires_in: body.expires_in.parse().unwrap_or(0),
        })
    }
}

/// The identity error code carried by a failed call, if any.
#[must_use]
pub fn error_code(err: &FirebaseError) -> Option<AuthErrorCode> {
    match err {
        FirebaseError::Api { message, .. } => Some(AuthErrorCode::from_api_message(message)),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;

    fn config(emulator: Option<&str>) -> FirebaseConfig {
        let vars = [
            ("FIREBASE_API_KEY", Some("AIzaTestKey")),
            ("FIREBASE_AUTH_DOMAIN", Some("bluefitt-connect.firebaseapp.com")),
            ("FIREBASE_PROJECT_ID", Some("bluefitt-connect")),
            ("FIREBASE_AUTH_EMULATOR_HOST", emulator),
        ];
        DashboardConfig::from_source(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .and_then(|(_, v)| v.map(str::to_string))
        })
        .unwrap()
        .firebase
        .unwrap()
    }

    #[test]
    fn test_parse_error_messages() {
        assert_eq!(
            AuthErrorCode::from_api_message("EMAIL_EXISTS"),
            AuthErrorCode::EmailExists
        );
        assert_eq!(
            AuthErrorCode::from_api_message(
                "WEAK_PASSWORD : Password should be at least 6 characters"
            ),
            AuthErrorCode::WeakPassword
        );
        assert_eq!(
            AuthErrorCode::from_api_message("SOMETHING_NEW"),
            AuthErrorCode::Unknown
        );
    }

    #[test]
    fn test_wrong_password_and_unknown_email_read_the_same() {
        assert_eq!(
            AuthErrorCode::InvalidPassword.message(),
            AuthErrorCode::EmailNotFound.message()
        );
        assert_eq!(AuthErrorCode::WeakPassword.to_string(), "weak-password");
    }

    #[test]
    fn test_slug_lookup() {
        assert_eq!(
            AuthErrorCode::from_slug("email-exists"),
            Some(AuthErrorCode::EmailExists)
        );
        assert_eq!(AuthErrorCode::from_slug("auth-failed"), Some(AuthErrorCode::Unknown));
        assert_eq!(AuthErrorCode::from_slug("nope"), None);
    }

    #[test]
    fn test_error_code_from_firebase_error() {
        let err = FirebaseError::Api {
            status: 400,
            message: "INVALID_LOGIN_CREDENTIALS".to_string(),
        };
        assert_eq!(error_code(&err), Some(AuthErrorCode::InvalidCredentials));
        assert_eq!(
            error_code(&FirebaseError::Credentials("x".to_string())),
            None
        );
    }

    #[test]
    fn test_production_urls() {
        let client = IdentityClient::new(&config(None)).unwrap();
        assert_eq!(
            client.accounts_url("signUp").unwrap().as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:signUp?key=AIzaTestKey"
        );
        assert_eq!(
            client
                .url(&client.inner.token_endpoint, "token")
                .unwrap()
                .as_str(),
            "https://securetoken.googleapis.com/v1/token?key=AIzaTestKey"
        );
    }

    #[test]
    fn test_emulator_urls() {
        let client = IdentityClient::new(&config(Some("127.0.0.1:9099"))).unwrap();
        assert_eq!(
            client.accounts_url("signInWithPassword").unwrap().as_str(),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword?key=AIzaTestKey"
        );
    }

    #[test]
    fn test_grant_debug_is_redacted() {
        let grant = TokenGrant {
            uid: "u1".to_string(),
            email: "ana@bluefitt.cl".to_string(),
            display_name: None,
            id_token: SecretString::from("secret-id".to_string()),
            refresh_token: SecretString::from("secret-refresh".to_string()),
            expires_in: 3600,
        };
        let debug = format!("{grant:?}");
        assert!(!debug.contains("secret-id"));
        assert!(!debug.contains("secret-refresh"));
    }
}
