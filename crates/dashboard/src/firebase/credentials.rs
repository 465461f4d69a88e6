//! Service-account credentials.
//!
//! A service account signs a short-lived RS256 JWT which Google exchanges for
//! an OAuth access token. Tokens are cached until shortly before they expire.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use moka::future::Cache;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{FirebaseError, http_client, read_json};

/// OAuth scope granting Firestore access.
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Default token endpoint when the key file omits one.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for each signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// How long an exchanged access token is reused.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(3300);

/// A parsed service-account key file.
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub token_uri: String,
    private_key: SecretString,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct KeyFile {
    project_id: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccount {
    /// Load a key file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a key file.
    pub fn from_file(path: &Path) -> Result<Self, FirebaseError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FirebaseError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Parse a key file's JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing.
    pub fn from_json(contents: &str) -> Result<Self, FirebaseError> {
        let key: KeyFile = serde_json::from_str(contents)?;
        if key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(FirebaseError::Credentials(
                "key file is missing client_email or private_key".to_string(),
            ));
        }

        Ok(Self {
            project_id: key.project_id,
            client_email: key.client_email,
            token_uri: key
                .token_uri
                .filter(|uri| !uri.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            private_key: SecretString::from(key.private_key),
        })
    }

    /// Sign a JWT bearer assertion issued at `issued_at` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the private key cannot be parsed.
    pub fn sign_assertion(&self, issued_at: i64) -> Result<String, FirebaseError> {
        let key = parse_private_key(self.private_key.expose_secret())?;
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&Claims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        })?);

        let signing_input = format!("{header}.{claims}");
        let signing_key = SigningKey::<Sha256>::new(key);
        let signature = signing_key.sign(signing_input.as_bytes());

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, FirebaseError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| FirebaseError::Credentials(format!("invalid private key: {e}")))
}

/// Source of cached OAuth access tokens for one service account.
#[derive(Clone)]
pub struct TokenSource {
    inner: Arc<TokenSourceInner>,
}

struct TokenSourceInner {
    account: ServiceAccount,
    client: reqwest::Client,
    cache: Cache<(), Arc<SecretString>>,
}

impl TokenSource {
    /// Create a token source.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(account: ServiceAccount) -> Result<Self, FirebaseError> {
        Ok(Self {
            inner: Arc::new(TokenSourceInner {
                account,
                client: http_client()?,
                cache: Cache::builder()
                    .max_capacity(1)
                    .time_to_live(TOKEN_CACHE_TTL)
                    .build(),
            }),
        })
    }

    /// The account tokens are issued for.
    #[must_use]
    pub fn account(&self) -> &ServiceAccount {
        &self.inner.account
    }

    /// Get a valid access token, exchanging a new assertion when the cached
    /// one has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the token exchange fails.
    pub async fn access_token(&self) -> Result<Arc<SecretString>, FirebaseError> {
        self.inner
            .cache
            .try_get_with((), self.exchange())
            .await
            .map_err(|e| FirebaseError::Credentials(e.to_string()))
    }

    async fn exchange(&self) -> Result<Arc<SecretString>, FirebaseError> {
        let account = &self.inner.account;
        let assertion = account.sign_assertion(chrono::Utc::now().timestamp())?;

        tracing::debug!(client_email = %account.client_email, "Exchanging service account assertion");

        let response = self
            .inner
            .client
            .post(&account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = read_json(response).await?;

        Ok(Arc::new(SecretString::from(token.access_token)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rsa::RsaPublicKey;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;

    use super::*;

    const TEST_KEY: &str = include_str!("testdata/test_key.pem");

    fn key_file() -> String {
        serde_json::json!({
            "type": "service_account",
            "project_id": "bluefitt-connect",
            "client_email": "importer@bluefitt-connect.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
            "token_uri": "https://oauth2.googleapis.com/token"
        })
        .to_string()
    }

    #[test]
    fn test_parse_key_file() {
        let account = ServiceAccount::from_json(&key_file()).unwrap();
        assert_eq!(account.project_id, "bluefitt-connect");
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
        assert!(!format!("{account:?}").contains("PRIVATE KEY"));
    }

    #[test]
    fn test_missing_private_key_is_rejected() {
        let json = r#"{"project_id":"p","client_email":"a@b","private_key":""}"#;
        assert!(matches!(
            ServiceAccount::from_json(json),
            Err(FirebaseError::Credentials(_))
        ));
    }

    #[test]
    fn test_assertion_is_signed_with_key() {
        let account = ServiceAccount::from_json(&key_file()).unwrap();
        let jwt = account.sign_assertion(1_700_000_000).unwrap();

        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);

        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["iss"], "importer@bluefitt-connect.iam.gserviceaccount.com");
        assert_eq!(claims["scope"], DATASTORE_SCOPE);
        assert_eq!(claims["exp"], 1_700_003_600);

        let private = parse_private_key(TEST_KEY).unwrap();
        let verifying = VerifyingKey::<Sha256>::new(RsaPublicKey::from(&private));
        let signature =
            Signature::try_from(URL_SAFE_NO_PAD.decode(parts[2]).unwrap().as_slice()).unwrap();
        let signing_input = format!("{}.{}", parts[0], parts[1]);
        assert!(verifying.verify(signing_input.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_invalid_key_fails_to_sign() {
        let json = r#"{"project_id":"p","client_email":"a@b","private_key":"not a key"}"#;
        let account = ServiceAccount::from_json(json).unwrap();
        assert!(account.sign_assertion(0).is_err());
    }
}
