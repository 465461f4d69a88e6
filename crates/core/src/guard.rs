//! Route access decisions.
//!
//! [`authorize`] is the single place that decides whether a viewer may see a
//! route. It knows nothing about HTTP frameworks; the dashboard's extractors
//! translate its [`Access`] into responses.

use crate::types::UserRole;

/// Where a signed-out viewer is sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// Where an under-privileged viewer is sent by redirecting guards.
pub const DASHBOARD_PATH: &str = "/";

/// What is known about the viewer's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    /// Identity has not been resolved yet.
    Loading,
    /// Resolved: nobody is signed in.
    Anonymous,
    /// Resolved: a signed-in viewer with this role.
    SignedIn(UserRole),
}

/// What to do with a viewer lacking the required role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissingRole {
    /// Send them back to the dashboard.
    RedirectToDashboard,
    /// Render an access-denied panel in place.
    AccessDenied,
}

/// What a route requires of its viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any signed-in viewer.
    Authenticated,
    /// A signed-in viewer whose role satisfies `role`.
    Role {
        role: UserRole,
        on_missing: OnMissingRole,
    },
}

impl Requirement {
    /// Admin-only, rendering an access-denied panel otherwise.
    pub const ADMIN_PANEL: Self = Self::Role {
        role: UserRole::Admin,
        on_missing: OnMissingRole::AccessDenied,
    };

    /// Admin-only, redirecting to the dashboard otherwise.
    pub const ADMIN_REDIRECT: Self = Self::Role {
        role: UserRole::Admin,
        on_missing: OnMissingRole::RedirectToDashboard,
    };
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Identity still loading; show a spinner.
    Pending,
    /// Render the route.
    Allow,
    /// Send the viewer elsewhere.
    Redirect(String),
    /// Render the access-denied panel.
    Deny,
}

/// Decide access for a viewer.
///
/// `return_path` is the path the viewer asked for; signed-out viewers are
/// sent to the sign-in page with it as `next`.
#[must_use]
pub fn authorize(state: IdentityState, requirement: Requirement, return_path: &str) -> Access {
    let role = match state {
        IdentityState::Loading => return Access::Pending,
        IdentityState::Anonymous => return Access::Redirect(login_redirect(return_path)),
        IdentityState::SignedIn(role) => role,
    };

    match requirement {
        Requirement::Authenticated => Access::Allow,
        Requirement::Role { role: required, .. } if role.satisfies(required) => Access::Allow,
        Requirement::Role {
            on_missing: OnMissingRole::RedirectToDashboard,
            ..
        } => Access::Redirect(DASHBOARD_PATH.to_owned()),
        Requirement::Role {
            on_missing: OnMissingRole::AccessDenied,
            ..
        } => Access::Deny,
    }
}

/// Sign-in URL carrying a return path.
#[must_use]
pub fn login_redirect(return_path: &str) -> String {
    let path = safe_return_path(Some(return_path));
    if path == DASHBOARD_PATH {
        LOGIN_PATH.to_owned()
    } else {
        format!("{LOGIN_PATH}?next={}", urlencoding::encode(path))
    }
}

/// Validate a user-supplied return path.
///
/// Only same-site absolute paths are accepted; anything else (external URLs,
/// protocol-relative `//host`, auth pages themselves) yields the dashboard.
#[must_use]
pub fn safe_return_path(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.starts_with("/auth/") =>
        {
            path
        }
        _ => DASHBOARD_PATH,
    }
}
