//! Firebase REST clients.
//!
//! # Architecture
//!
//! - [`firestore`] - Cloud Firestore REST API, implementing
//!   [`bluefitt_core::store::DocumentStore`]
//! - [`auth`] - Identity Toolkit and Secure Token REST APIs
//! - [`credentials`] - Service-account OAuth tokens for server-side writes
//! - [`value`] - Firestore typed-JSON value codec
//!
//! All clients talk to Google directly with `reqwest`, or to the local
//! emulators when `FIRESTORE_EMULATOR_HOST` / `FIREBASE_AUTH_EMULATOR_HOST`
//! are set.

pub mod auth;
pub mod credentials;
pub mod firestore;
pub mod value;

pub use auth::{AuthErrorCode, IdentityClient, TokenGrant};
pub use credentials::{ServiceAccount, TokenSource};
pub use firestore::{FirestoreClient, FirestoreStore};

use bluefitt_core::store::StoreError;
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

/// Errors that can occur when calling Firebase.
#[derive(Debug, Error)]
pub enum FirebaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Service-account credentials could not be loaded or used.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// A URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<FirebaseError> for StoreError {
    fn from(err: FirebaseError) -> Self {
        match err {
            FirebaseError::Api { status: 401 | 403, message } => Self::PermissionDenied(message),
            FirebaseError::Api {
                status: 400 | 404 | 409 | 412,
                message,
            } => Self::Rejected(message),
            FirebaseError::Parse(e) => Self::Decode(e.to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Error envelope shared by Google REST APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Decode a successful JSON response, or turn an error response into
/// [`FirebaseError::Api`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FirebaseError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body).map_or_else(
            |_| body.chars().take(200).collect(),
            |parsed| parsed.error.message,
        );
        tracing::debug!(status = %status, message = %message, "Firebase API error");
        return Err(FirebaseError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// Build an HTTP client for Firebase calls.
fn http_client() -> Result<reqwest::Client, FirebaseError> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_map_to_store_errors() {
        let denied = StoreError::from(FirebaseError::Api {
            status: 403,
            message: "Missing or insufficient permissions.".to_string(),
        });
        assert!(matches!(denied, StoreError::PermissionDenied(_)));

        let rejected = StoreError::from(FirebaseError::Api {
            status: 404,
            message: "No document to update".to_string(),
        });
        assert!(matches!(rejected, StoreError::Rejected(_)));

        let unavailable = StoreError::from(FirebaseError::Api {
            status: 503,
            message: "The service is currently unavailable.".to_string(),
        });
        assert!(matches!(unavailable, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_error_display() {
        let err = FirebaseError::Api {
            status: 400,
            message: "EMAIL_EXISTS".to_string(),
        };
        assert_eq!(err.to_string(), "API error (400): EMAIL_EXISTS");
    }
}
