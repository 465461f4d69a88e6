//! Product catalog queries.

use chrono::Utc;
use tracing::instrument;

use bluefitt_core::models::collections;
use bluefitt_core::store::{DocumentStore, FieldFilter};
use bluefitt_core::{Fetch, Product};

/// List products, optionally restricted to one category.
///
/// A blank category lists everything.
#[instrument(skip(store))]
pub async fn products<S: DocumentStore>(store: &S, category: Option<&str>) -> Fetch<Vec<Product>> {
    let filter = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| FieldFilter::equals("category", c));
    let now = Utc::now();

    Fetch::from_result(store.list(collections::PRODUCTS, filter.as_ref()).await).map(|docs| {
        docs.iter()
            .map(|doc| Product::from_document(doc, now))
            .collect()
    })
}

/// Look up one product by code. A missing document is not an error.
#[instrument(skip(store))]
pub async fn product_by_id<S: DocumentStore>(store: &S, id: &str) -> Fetch<Product> {
    let now = Utc::now();
    Fetch::from_lookup(store.get(collections::PRODUCTS, id).await)
        .map(|doc| Product::from_document(&doc, now))
}

/// Distinct non-empty categories of `products`, sorted.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut categories: Vec<String> = products
        .iter()
        .map(|p| p.category.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect();
    categories.sort_unstable();
    categories.dedup();
    categories
}
