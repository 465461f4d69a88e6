//! Rules for changing user roles and removing user profiles.
//!
//! These checks run before any write so a rejected change never reaches the
//! store.

use thiserror::Error;

use crate::models::AppUser;
use crate::types::{UserRole, UserUid};

/// Why a role change was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleChangeError {
    /// The actor is missing from the user list or no longer an admin.
    #[error("only admins can change roles")]
    NotAdmin,
    /// An admin tried to remove their own admin role.
    #[error("you cannot remove your own admin role")]
    SelfDemotion,
    /// The target is the only admin left.
    #[error("the last remaining admin must keep the admin role")]
    LastAdmin,
    /// The target is not in the user list.
    #[error("unknown user: {0}")]
    UnknownUser(UserUid),
}

/// Why a profile removal was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserRemovalError {
    /// The actor is missing from the user list or no longer an admin.
    #[error("only admins can delete users")]
    NotAdmin,
    /// Admins remove their own account from settings instead.
    #[error("you cannot delete your own profile here")]
    SelfRemoval,
    /// The target is the only admin left.
    #[error("the last remaining admin cannot be deleted")]
    LastAdmin,
    /// The target is not in the user list.
    #[error("unknown user: {0}")]
    UnknownUser(UserUid),
}

/// Accepted role change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    /// Write the new role.
    Apply,
    /// The user already has this role; nothing to write.
    Unchanged,
}

fn admin_count(users: &[AppUser]) -> usize {
    users.iter().filter(|u| u.is_admin()).count()
}

/// Whether `actor` is an admin according to `users`, not to any cached copy.
fn is_listed_admin(actor: &UserUid, users: &[AppUser]) -> bool {
    users.iter().any(|u| &u.uid == actor && u.is_admin())
}

/// Check whether `actor` may set `target`'s role to `new_role`.
///
/// # Errors
///
/// Returns [`RoleChangeError::NotAdmin`] when `actor` is not an admin in
/// `users`, [`RoleChangeError::SelfDemotion`] when an admin demotes themself,
/// [`RoleChangeError::LastAdmin`] when the target is the only admin, and
/// [`RoleChangeError::UnknownUser`] when the target is not in `users`.
pub fn check_role_change(
    actor: &UserUid,
    target: &UserUid,
    new_role: UserRole,
    users: &[AppUser],
) -> Result<RoleChange, RoleChangeError> {
    let current = users
        .iter()
        .find(|u| &u.uid == target)
        .ok_or_else(|| RoleChangeError::UnknownUser(target.clone()))?;

    if !is_listed_admin(actor, users) {
        return Err(RoleChangeError::NotAdmin);
    }
    if current.role == new_role {
        return Ok(RoleChange::Unchanged);
    }

    if current.is_admin() {
        if actor == target {
            return Err(RoleChangeError::SelfDemotion);
        }
        if admin_count(users) <= 1 {
            return Err(RoleChangeError::LastAdmin);
        }
    }

    Ok(RoleChange::Apply)
}

/// Check whether `actor` may delete `target`'s profile document.
///
/// # Errors
///
/// Returns [`UserRemovalError::NotAdmin`] when `actor` is not an admin in
/// `users`, [`UserRemovalError::SelfRemoval`] for the actor's own profile,
/// [`UserRemovalError::LastAdmin`] for the only admin, and
/// [`UserRemovalError::UnknownUser`] when the target is not in `users`.
pub fn check_user_removal(
    actor: &UserUid,
    target: &UserUid,
    users: &[AppUser],
) -> Result<(), UserRemovalError> {
    let current = users
        .iter()
        .find(|u| &u.uid == target)
        .ok_or_else(|| UserRemovalError::UnknownUser(target.clone()))?;

    if !is_listed_admin(actor, users) {
        return Err(UserRemovalError::NotAdmin);
    }
    if actor == target {
        return Err(UserRemovalError::SelfRemoval);
    }
    if current.is_admin() && admin_count(users) <= 1 {
        return Err(UserRemovalError::LastAdmin);
    }

    Ok(())
}
