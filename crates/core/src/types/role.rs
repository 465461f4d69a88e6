//! User roles stored on profile documents.

use serde::{Deserialize, Serialize};

/// Role of a dashboard user.
///
/// Stored lower-case in the `role` field of `users/{uid}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access including user management.
    Admin,
    /// Can write blog posts and manage catalog content.
    Editor,
    /// Read-only dashboard access.
    #[default]
    User,
}

impl UserRole {
    /// All roles, highest privilege first.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Editor, Self::User];

    /// Parse a stored role, falling back to [`UserRole::User`] for anything unknown.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.trim().to_lowercase().parse().unwrap_or_default()
    }

    /// Whether this role grants at least the privileges of `required`.
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    /// Human-readable label shown in the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrador",
            Self::Editor => "Editor",
            Self::User => "Usuario",
        }
    }

    /// Stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::User => "user",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Admin => 2,
            Self::Editor => 1,
            Self::User => 0,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "user" => Ok(Self::User),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
