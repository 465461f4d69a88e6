//! Domain records read from and written to the document store.
//!
//! Each record has a total `from_document` constructor (see
//! [`crate::normalize`]) and a `to_fields` encoder for writes.

pub mod post;
pub mod product;
pub mod user;

pub use post::Post;
pub use product::{DimensionEntry, Product};
pub use user::AppUser;

/// Collection names in the document store.
pub mod collections {
    /// Product catalog, keyed by product code.
    pub const PRODUCTS: &str = "products";
    /// User profiles, keyed by identity uid.
    pub const USERS: &str = "users";
    /// Blog posts, keyed by slug.
    pub const POSTS: &str = "posts";
}
