//! Flat product feed import.
//!
//! A feed is a JSON array of flat product records as exported from the
//! product spreadsheet. Each record with a code becomes one full-document
//! write to `products/{code}`; writes are committed in batches of at most
//! [`BATCH_LIMIT`]. The import is linear and at-most-once: nothing is retried
//! and nothing is deduplicated beyond "same code overwrites same document".

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::document::{FieldValue, Fields, RawDocument};
use crate::models::{Product, collections};
use crate::normalize;
use crate::store::{DocumentStore, StoreError, Write};
use crate::types::ProductCode;

/// Maximum number of writes per batch commit.
pub const BATCH_LIMIT: usize = 400;

/// Storage directory that bare image filenames are placed under.
pub const IMAGE_DIRECTORY: &str = "images/productImage";

/// Errors that abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("product feed must be a JSON array")]
    NotAnArray,

    /// A full batch failed to commit. Earlier batches stay committed.
    #[error("commit of batch {batch} failed: {source}")]
    Commit {
        batch: usize,
        #[source]
        source: StoreError,
    },
}

/// Counts reported at the end of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Records in the feed.
    pub total: usize,
    /// Records staged for writing.
    pub processed: usize,
    /// Records without a code.
    pub skipped: usize,
    /// Staged records whose batch committed.
    pub succeeded: usize,
    /// Skipped records plus records of a failed final batch.
    pub failed: usize,
    /// Batches committed successfully.
    pub batches: usize,
}

/// Parse a feed file's contents into its records.
///
/// # Errors
///
/// Returns [`ImportError::Json`] for malformed JSON and
/// [`ImportError::NotAnArray`] when the root is not an array.
pub fn parse_feed(contents: &str) -> Result<Vec<serde_json::Value>, ImportError> {
    match serde_json::from_str(contents)? {
        serde_json::Value::Array(records) => Ok(records),
        _ => Err(ImportError::NotAnArray),
    }
}

/// Place a bare filename under [`IMAGE_DIRECTORY`].
///
/// Paths containing `/` and URLs are returned unchanged.
#[must_use]
pub fn image_path(name: &str) -> String {
    let name = name.trim();
    if name.contains('/') || name.contains("://") || name.starts_with("data:") {
        name.to_owned()
    } else {
        format!("{IMAGE_DIRECTORY}/{name}")
    }
}

/// Transform one feed record into a product write.
///
/// Returns `None` when the record is not an object or has no usable code.
/// Keys are accepted in camelCase or snake_case. Timestamps are set to `now`.
#[must_use]
pub fn transform_record(
    record: &serde_json::Value,
    now: DateTime<Utc>,
) -> Option<(ProductCode, Fields)> {
    let FieldValue::Map(fields) = FieldValue::from_json(record) else {
        return None;
    };
    let code = normalize::optional_text(fields.get("code"))?;

    let mut product = Product::from_document(&RawDocument::new(code.clone(), fields), now);
    product.images = product.images.iter().map(String::as_str).map(image_path).collect();
    product.related_images = product
        .related_images
        .iter()
        .map(String::as_str)
        .map(image_path)
        .collect();
    product.dimension_image = product.dimension_image.as_deref().map(image_path);
    product.is_active = true;
    product.created_at = now;
    product.updated_at = now;

    Some((ProductCode::new(code), product.to_fields()))
}

/// Import feed records into `store`.
///
/// Full batches are committed as soon as they fill up; a failure there aborts
/// the run. The final partial batch is committed at the end; a failure there
/// counts its records as failed and the run still completes.
///
/// # Errors
///
/// Returns [`ImportError::Commit`] when a full batch fails to commit.
pub async fn import_records<S: DocumentStore>(
    store: &S,
    records: &[serde_json::Value],
    now: DateTime<Utc>,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary {
        total: records.len(),
        ..ImportSummary::default()
    };
    let mut batch = Vec::with_capacity(BATCH_LIMIT);

    for record in records {
        let Some((code, fields)) = transform_record(record, now) else {
            summary.skipped += 1;
            continue;
        };
        batch.push(Write::Set {
            collection: collections::PRODUCTS.to_owned(),
            id: code.into_inner(),
            fields,
        });
        summary.processed += 1;

        if batch.len() == BATCH_LIMIT {
            let staged = std::mem::replace(&mut batch, Vec::with_capacity(BATCH_LIMIT));
            store
                .commit(staged)
                .await
                .map_err(|source| ImportError::Commit {
                    batch: summary.batches + 1,
                    source,
                })?;
            summary.batches += 1;
            summary.succeeded += BATCH_LIMIT;
        }
    }

    if !batch.is_empty() {
        let size = batch.len();
        if store.commit(batch).await.is_ok() {
            summary.batches += 1;
            summary.succeeded += size;
        } else {
            summary.failed += size;
        }
    }

    summary.failed += summary.skipped;
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn valid(n: usize) -> Vec<serde_json::Value> {
        (0..n)
            .map(|i| json!({"code": format!("P{i:04}"), "name": "Tubo"}))
            .collect()
    }

    #[test]
    fn test_single_record_example() {
        let record = json!({
            "code": "A1",
            "name": "Valve",
            "category": "Valvula",
            "description": "d",
            "images": "a.png, b.png"
        });
        let (code, fields) = transform_record(&record, now()).unwrap();

        assert_eq!(code.as_str(), "A1");
        assert_eq!(
            fields["images"],
            FieldValue::from(vec![
                "images/productImage/a.png".to_string(),
                "images/productImage/b.png".to_string(),
            ])
        );
        assert_eq!(fields["price"], FieldValue::Integer(0));
        assert_eq!(fields["stock"], FieldValue::Integer(0));
        assert_eq!(fields["isActive"], FieldValue::Bool(true));
        assert_eq!(fields["aiHint"], FieldValue::from("valvula"));
        assert_eq!(fields["createdAt"], FieldValue::Timestamp(now()));
    }

    #[test]
    fn test_record_without_code_is_skipped() {
        assert!(transform_record(&json!({"name": "Valve"}), now()).is_none());
        assert!(transform_record(&json!({"code": "   "}), now()).is_none());
        assert!(transform_record(&json!("A1"), now()).is_none());
    }

    #[test]
    fn test_numeric_code_and_snake_case_keys() {
        let record = json!({
            "code": 7_801_234,
            "related_images": "x.png,https://cdn.bluefitt.cl/y.png",
            "dimension_image": "dim.png",
            "dimensions": "A: 110 mm, B: 45 mm",
            "price": 12990,
            "isActive": false
        });
        let (code, fields) = transform_record(&record, now()).unwrap();

        assert_eq!(code.as_str(), "7801234");
        assert_eq!(
            fields["relatedImages"],
            FieldValue::from(vec![
                "images/productImage/x.png".to_string(),
                "https://cdn.bluefitt.cl/y.png".to_string(),
            ])
        );
        assert_eq!(
            fields["dimensionImage"],
            FieldValue::from("images/productImage/dim.png")
        );
        let FieldValue::Array(dims) = &fields["dimensions"] else {
            panic!("dimensions should be an array");
        };
        assert_eq!(dims.len(), 2);
        assert_eq!(fields["price"], FieldValue::Integer(12990));
        assert_eq!(fields["isActive"], FieldValue::Bool(true));
    }

    #[test]
    fn test_image_path() {
        assert_eq!(image_path(" a.png "), "images/productImage/a.png");
        assert_eq!(image_path("catalogo/a.png"), "catalogo/a.png");
        assert_eq!(image_path("https://x.cl/a.png"), "https://x.cl/a.png");
    }

    #[test]
    fn test_parse_feed_requires_array() {
        assert_eq!(parse_feed("[{\"code\":\"A1\"}]").unwrap().len(), 1);
        assert!(matches!(parse_feed("{\"code\":\"A1\"}"), Err(ImportError::NotAnArray)));
        assert!(matches!(parse_feed("[{"), Err(ImportError::Json(_))));
    }

    #[tokio::test]
    async fn test_batches_of_limit_with_partial_tail() {
        let store = MemoryStore::new();
        let summary = import_records(&store, &valid(901), now()).await.unwrap();

        assert_eq!(store.commit_sizes(), vec![400, 400, 101]);
        assert_eq!(summary.processed, 901);
        assert_eq!(summary.succeeded, 901);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.batches, 3);
        assert_eq!(store.count(collections::PRODUCTS), 901);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_tail() {
        let store = MemoryStore::new();
        import_records(&store, &valid(800), now()).await.unwrap();
        assert_eq!(store.commit_sizes(), vec![400, 400]);

        let empty = MemoryStore::new();
        let summary = import_records(&empty, &[], now()).await.unwrap();
        assert!(empty.commit_sizes().is_empty());
        assert_eq!(summary, ImportSummary::default());
    }

    #[tokio::test]
    async fn test_skipped_records_count_as_failed() {
        let mut records = valid(3);
        records.push(json!({"name": "sin código"}));
        records.push(json!({"code": ""}));

        let store = MemoryStore::new();
        let summary = import_records(&store, &records, now()).await.unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.processed + summary.skipped, summary.total);
        assert_eq!(summary.failed, 2);
        assert_eq!(store.commit_sizes(), vec![3]);
    }

    #[tokio::test]
    async fn test_final_batch_failure_is_counted() {
        let store = MemoryStore::failing_commit(2);
        let summary = import_records(&store, &valid(450), now()).await.unwrap();

        assert_eq!(summary.succeeded, 400);
        assert_eq!(summary.failed, 50);
        assert_eq!(summary.batches, 1);
        assert_eq!(store.count(collections::PRODUCTS), 400);
    }

    #[tokio::test]
    async fn test_full_batch_failure_aborts() {
        let store = MemoryStore::failing_commit(1);
        let result = import_records(&store, &valid(450), now()).await;

        assert!(matches!(result, Err(ImportError::Commit { batch: 1, .. })));
        assert_eq!(store.commit_sizes(), vec![400]);
        assert_eq!(store.count(collections::PRODUCTS), 0);
    }

    #[tokio::test]
    async fn test_same_code_overwrites() {
        let records = vec![
            json!({"code": "A1", "name": "Primera"}),
            json!({"code": "A1", "name": "Segunda"}),
        ];
        let store = MemoryStore::new();
        let summary = import_records(&store, &records, now()).await.unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(store.count(collections::PRODUCTS), 1);
        let doc = store.get(collections::PRODUCTS, "A1").await.unwrap().unwrap();
        assert_eq!(doc.get("name").and_then(FieldValue::as_str), Some("Segunda"));
    }
}
