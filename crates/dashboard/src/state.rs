//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::firebase::FirebaseError;
use crate::services::IdentityProvider;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and owns the single
/// [`IdentityProvider`] of the running dashboard.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    identity: IdentityProvider,
}

impl AppState {
    /// Create the application state.
    ///
    /// Without Firebase settings the identity provider is built disabled and
    /// every operation fails fast with the configuration problem.
    ///
    /// # Errors
    ///
    /// Returns an error if the Firebase clients cannot be built.
    pub fn new(config: DashboardConfig) -> Result<Self, FirebaseError> {
        let identity = match &config.firebase {
            Some(firebase) => IdentityProvider::new(firebase)?,
            None => IdentityProvider::disabled(
                config
                    .backend_disabled_reason
                    .clone()
                    .unwrap_or_else(|| "Firebase is not configured".to_string()),
            ),
        };

        Ok(Self {
            inner: Arc::new(AppStateInner { config, identity }),
        })
    }

    /// Get a reference to the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// Get a reference to the session identity provider.
    #[must_use]
    pub fn identity(&self) -> &IdentityProvider {
        &self.inner.identity
    }

    /// Browser URL for a stored image path.
    ///
    /// Absolute URLs pass through; bucket paths are resolved against the
    /// configured Storage bucket, or served as-is without one.
    #[must_use]
    pub fn image_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        self.inner
            .config
            .firebase
            .as_ref()
            .and_then(|firebase| firebase.storage_url(path))
            .unwrap_or_else(|| format!("/{}", path.trim_start_matches('/')))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_firebase_builds_disabled_provider() {
        let config = DashboardConfig::from_source(|_| None).unwrap();
        let state = AppState::new(config).unwrap();
        assert!(!state.identity().is_enabled());
        assert_eq!(state.image_url("images/productImage/a.png"), "/images/productImage/a.png");
        assert_eq!(state.image_url("https://cdn.example/a.png"), "https://cdn.example/a.png");
    }
}
