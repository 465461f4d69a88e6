//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Most pages handle per-operation failures at the
//! call site (a `?error=` redirect or a fetch error panel); `AppError` covers
//! what is left.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use bluefitt_core::store::StoreError;

use crate::services::AuthError;

/// Application-level error type for the dashboard.
#[derive(Debug, Error)]
pub enum AppError {
    /// Identity operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::BackendDisabled(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(AuthError::NotSignedIn | AuthError::Provider(_)) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(AuthError::InvalidEmail(_) | AuthError::MissingDisplayName) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(StoreError::PermissionDenied(_)) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Store(StoreError::Unavailable(_)) | Self::Auth(AuthError::Firebase(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) | Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Auth(err) => crate::services::identity::error_message(err.code())
                .unwrap_or("Error de autenticación")
                .to_string(),
            Self::Store(StoreError::PermissionDenied(_)) => {
                "No tienes permisos para realizar esta acción".to_string()
            }
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                "Error interno del servidor".to_string()
            }
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// ```rust,ignore
/// add_breadcrumb("admin", "Changed user role", Some(&[("uid", "abc123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use crate::firebase::AuthErrorCode;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("A1".to_string());
        assert_eq!(err.to_string(), "Not found: A1");

        let err = AppError::BadRequest("invalid role".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid role");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound("x".to_string())), StatusCode::NOT_FOUND);
        assert_eq!(get_status(AppError::Unauthorized("x".to_string())), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden("x".to_string())), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AppError::BadRequest("x".to_string())), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            get_status(AppError::Auth(AuthError::BackendDisabled("off".to_string()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::Provider(AuthErrorCode::InvalidPassword))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::PermissionDenied("rules".to_string()))),
            StatusCode::FORBIDDEN
        );
    }
}
