//! Document store abstraction.
//!
//! The dashboard and the import command talk to the document database only
//! through [`DocumentStore`]. Writes go through [`DocumentStore::commit`], which
//! applies a batch atomically; single-document helpers commit a batch of one.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::document::{FieldValue, Fields, RawDocument};

/// Errors returned by a document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or failed internally.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The caller's credentials do not allow the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The store refused the request (bad input, missing document on update, limits).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// A response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// One staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or fully overwrite a document.
    Set {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Overwrite only the given fields of an existing document.
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Remove a document. Removing a missing document succeeds.
    Delete { collection: String, id: String },
}

impl Write {
    /// Collection the write targets.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    /// Document id the write targets.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Set { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => id,
        }
    }
}

/// Equality filter on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: FieldValue,
}

impl FieldFilter {
    /// `field == value`.
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

/// A schemaless document database.
pub trait DocumentStore: Send + Sync {
    /// Read one document; `Ok(None)` if it does not exist.
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<RawDocument>, StoreError>> + Send;

    /// Read every document in a collection, optionally filtered, ordered by id.
    fn list(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> impl Future<Output = Result<Vec<RawDocument>, StoreError>> + Send;

    /// Apply all writes atomically: either every write lands or none does.
    fn commit(&self, writes: Vec<Write>) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Create or overwrite one document.
    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.commit(vec![Write::Set {
            collection: collection.to_owned(),
            id: id.to_owned(),
            fields,
        }])
    }

    /// Overwrite some fields of an existing document.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.commit(vec![Write::Update {
            collection: collection.to_owned(),
            id: id.to_owned(),
            fields,
        }])
    }

    /// Remove one document.
    fn delete(&self, collection: &str, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.commit(vec![Write::Delete {
            collection: collection.to_owned(),
            id: id.to_owned(),
        }])
    }
}

type Collections = BTreeMap<String, BTreeMap<String, Fields>>;

/// In-process document store.
///
/// Used by tests and by dry-run imports. Records the size of every commit and
/// can be told to fail a specific commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    commits: Mutex<Vec<usize>>,
    fail_commit: Option<usize>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose `n`-th commit (1-based) fails with `Unavailable`.
    #[must_use]
    pub fn failing_commit(n: usize) -> Self {
        Self {
            fail_commit: Some(n),
            ..Self::default()
        }
    }

    /// Seed a document directly, bypassing commit accounting.
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        lock(&self.collections)
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), fields);
    }

    /// Sizes of every commit attempted so far, in order (failed ones included).
    #[must_use]
    pub fn commit_sizes(&self) -> Vec<usize> {
        lock(&self.commits).clone()
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        lock(&self.collections).get(collection).map_or(0, BTreeMap::len)
    }

    fn apply(collections: &mut Collections, write: Write) -> Result<(), StoreError> {
        match write {
            Write::Set {
                collection,
                id,
                fields,
            } => {
                collections.entry(collection).or_default().insert(id, fields);
            }
            Write::Update {
                collection,
                id,
                fields,
            } => {
                let doc = collections
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                    .ok_or_else(|| StoreError::Rejected(format!("no document {collection}/{id}")))?;
                doc.extend(fields);
            }
            Write::Delete { collection, id } => {
                if let Some(docs) = collections.get_mut(&collection) {
                    docs.remove(&id);
                }
            }
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<RawDocument>, StoreError> {
        Ok(lock(&self.collections)
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| RawDocument::new(id, fields.clone())))
    }

    async fn list(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<RawDocument>, StoreError> {
        Ok(lock(&self.collections)
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| filter.is_none_or(|f| f.matches(fields)))
                    .map(|(id, fields)| RawDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let attempt = {
            let mut commits = lock(&self.commits);
            commits.push(writes.len());
            commits.len()
        };
        if self.fail_commit == Some(attempt) {
            return Err(StoreError::Unavailable(format!("commit {attempt} failed")));
        }

        // Apply to a copy so a rejected write leaves the store untouched.
        let mut collections = lock(&self.collections);
        let mut staged = collections.clone();
        for write in writes {
            Self::apply(&mut staged, write)?;
        }
        *collections = staged;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), FieldValue::from(*v)))
            .collect()
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store.set("products", "A1", fields(&[("name", "Valve")])).await.unwrap();

        let doc = store.get("products", "A1").await.unwrap().unwrap();
        assert_eq!(doc.get("name").and_then(FieldValue::as_str), Some("Valve"));

        store.delete("products", "A1").await.unwrap();
        assert!(store.get("products", "A1").await.unwrap().is_none());
        assert_eq!(store.commit_sizes(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_update_merges_and_requires_existing() {
        let store = MemoryStore::new();
        store.insert("users", "u1", fields(&[("role", "user"), ("email", "a@b.c")]));
        store.update("users", "u1", fields(&[("role", "admin")])).await.unwrap();

        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.get("role").and_then(FieldValue::as_str), Some("admin"));
        assert_eq!(doc.get("email").and_then(FieldValue::as_str), Some("a@b.c"));

        let missing = store.update("users", "nope", fields(&[("role", "admin")])).await;
        assert!(matches!(missing, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_commit_is_atomic() {
        let store = MemoryStore::new();
        let result = store
            .commit(vec![
                Write::Set {
                    collection: "products".into(),
                    id: "A1".into(),
                    fields: Fields::new(),
                },
                Write::Update {
                    collection: "products".into(),
                    id: "missing".into(),
                    fields: Fields::new(),
                },
            ])
            .await;
        assert!(result.is_err());
        assert_eq!(store.count("products"), 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_equality() {
        let store = MemoryStore::new();
        store.insert("products", "A1", fields(&[("category", "Valvula")]));
        store.insert("products", "B2", fields(&[("category", "Tuberia")]));
        store.insert("products", "C3", fields(&[("category", "Valvula")]));

        let filter = FieldFilter::equals("category", "Valvula");
        let docs = store.list("products", Some(&filter)).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "C3"]);
        assert_eq!(store.list("products", None).await.unwrap().len(), 3);
        assert!(store.list("posts", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_commit() {
        let store = MemoryStore::failing_commit(2);
        store.set("p", "1", Fields::new()).await.unwrap();
        assert!(store.set("p", "2", Fields::new()).await.is_err());
        store.set("p", "3", Fields::new()).await.unwrap();
        assert_eq!(store.count("p"), 2);
        assert_eq!(store.commit_sizes(), vec![1, 1, 1]);
    }
}
