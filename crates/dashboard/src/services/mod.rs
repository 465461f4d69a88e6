//! Business logic services for the dashboard.
//!
//! # Services
//!
//! - `identity` - Session identity provider (sign-in, sign-up, profile, account)
//! - `catalog` - Product queries
//! - `directory` - User profiles and role administration
//! - `blog` - Posts and markdown rendering
//!
//! Read services return [`bluefitt_core::Fetch`] and issue exactly one store
//! read; they are generic over [`bluefitt_core::store::DocumentStore`].

pub mod blog;
pub mod catalog;
pub mod directory;
pub mod identity;

pub use identity::{AuthError, IdentityEvent, IdentityProvider, spawn_audit_log};
