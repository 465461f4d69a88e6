//! Bluefitt Connect Core - Shared types library.
//!
//! This crate provides the types and pure logic used across all Bluefitt components:
//! - `dashboard` - Catalog, blog and user administration web panel
//! - `cli` - Command-line tools (product feed import)
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no network
//! I/O, no HTTP clients. Document storage is reached through the
//! [`store::DocumentStore`] trait; the Firestore implementation lives in the
//! dashboard crate, and [`store::MemoryStore`] backs tests and dry runs.
//!
//! # Modules
//!
//! - [`types`] - Newtype keys, email, roles and prices
//! - [`document`] - Schemaless document values
//! - [`normalize`] - Total normalization of stored shapes into canonical ones
//! - [`models`] - Products, users and blog posts
//! - [`guard`] - Route access decisions
//! - [`policy`] - Role change and user removal rules
//! - [`fetch`] - Result state of a single data read
//! - [`store`] - Document store trait and in-memory implementation
//! - [`import`] - Flat product feed transformation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod document;
pub mod fetch;
pub mod guard;
pub mod import;
pub mod models;
pub mod normalize;
pub mod policy;
pub mod store;
pub mod types;

pub use document::{FieldValue, Fields, RawDocument};
pub use fetch::Fetch;
pub use models::{AppUser, DimensionEntry, Post, Product};
pub use types::*;
