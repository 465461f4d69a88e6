//! Cloud Firestore REST client.
//!
//! [`FirestoreClient`] holds the endpoint and HTTP client; a
//! [`FirestoreStore`] pairs it with the credentials of one caller (a signed-in
//! user's ID token, a service account, or nobody) and implements
//! [`DocumentStore`].

use std::sync::Arc;

use bluefitt_core::RawDocument;
use bluefitt_core::store::{DocumentStore, FieldFilter, StoreError, Write};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;
use url::Url;

use super::credentials::TokenSource;
use super::{FirebaseError, http_client, read_json, value};
use crate::config::FirebaseConfig;

/// Production Firestore endpoint.
const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1/";

/// Documents per page when listing a collection.
const LIST_PAGE_SIZE: &str = "300";

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    endpoint: Url,
    project_id: String,
    api_key: Option<String>,
    emulator: bool,
}

/// Who a request is made as.
#[derive(Clone)]
enum Caller {
    Anonymous,
    IdToken(Arc<SecretString>),
    ServiceAccount(TokenSource),
}

/// A Firestore handle acting as one caller.
#[derive(Clone)]
pub struct FirestoreStore {
    client: FirestoreClient,
    caller: Caller,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    name: String,
    #[serde(default)]
    fields: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<DocumentResponse>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<DocumentResponse>,
}

impl DocumentResponse {
    fn into_raw(self) -> RawDocument {
        let id = self.name.rsplit('/').next().unwrap_or_default().to_owned();
        RawDocument::new(id, value::decode_fields(self.fields.as_ref()))
    }
}

impl FirestoreClient {
    /// Create a client for the configured project, honouring
    /// `FIRESTORE_EMULATOR_HOST`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the emulator
    /// host is not a valid address.
    pub fn new(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        Self::build(
            &config.project_id,
            config.firestore_emulator_host.as_deref(),
            Some(config.api_key().to_owned()),
        )
    }

    /// Create a client for a project without an API key (service-account use).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the emulator
    /// host is not a valid address.
    pub fn for_project(project_id: &str, emulator_host: Option<&str>) -> Result<Self, FirebaseError> {
        Self::build(project_id, emulator_host, None)
    }

    fn build(
        project_id: &str,
        emulator_host: Option<&str>,
        api_key: Option<String>,
    ) -> Result<Self, FirebaseError> {
        let endpoint = match emulator_host {
            Some(host) => Url::parse(&format!("http://{host}/v1/"))?,
            None => Url::parse(FIRESTORE_ENDPOINT)?,
        };

        Ok(Self {
            inner: Arc::new(FirestoreClientInner {
                client: http_client()?,
                endpoint,
                project_id: project_id.to_owned(),
                api_key,
                emulator: emulator_host.is_some(),
            }),
        })
    }

    /// Act as nobody; only publicly readable documents are visible.
    #[must_use]
    pub fn anonymous(&self) -> FirestoreStore {
        self.store(Caller::Anonymous)
    }

    /// Act as a signed-in user, subject to security rules.
    #[must_use]
    pub fn as_user(&self, id_token: SecretString) -> FirestoreStore {
        self.store(Caller::IdToken(Arc::new(id_token)))
    }

    /// Act as a service account, bypassing security rules.
    #[must_use]
    pub fn as_service_account(&self, tokens: TokenSource) -> FirestoreStore {
        self.store(Caller::ServiceAccount(tokens))
    }

    fn store(&self, caller: Caller) -> FirestoreStore {
        FirestoreStore {
            client: self.clone(),
            caller,
        }
    }

    /// Resource name of the documents root.
    #[must_use]
    pub fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.inner.project_id
        )
    }

    /// Resource name of one document.
    #[must_use]
    pub fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_root())
    }

    /// Whether requests go to the local emulator.
    #[must_use]
    pub fn is_emulator(&self) -> bool {
        self.inner.emulator
    }

    fn url(&self, path: &str) -> Result<Url, FirebaseError> {
        let mut url = self.inner.endpoint.join(path)?;
        if let Some(key) = &self.inner.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }
}

impl FirestoreStore {
    /// The underlying client.
    #[must_use]
    pub const fn client(&self) -> &FirestoreClient {
        &self.client
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, FirebaseError> {
        Ok(match &self.caller {
            Caller::Anonymous => request,
            Caller::IdToken(token) => request.bearer_auth(token.expose_secret()),
            Caller::ServiceAccount(tokens) => {
                let token = tokens.access_token().await?;
                request.bearer_auth(token.expose_secret())
            }
        })
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<RawDocument>, FirebaseError> {
        let url = self.client.url(&format!(
            "{}/{collection}/{}",
            self.client.documents_root(),
            urlencoding::encode(id)
        ))?;
        let request = self.authorize(self.client.inner.client.get(url)).await?;

        match read_json::<DocumentResponse>(request.send().await?).await {
            Ok(doc) => Ok(Some(doc.into_raw())),
            Err(FirebaseError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<RawDocument>, FirebaseError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self
                .client
                .url(&format!("{}/{collection}", self.client.documents_root()))?;
            url.query_pairs_mut().append_pair("pageSize", LIST_PAGE_SIZE);
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let request = self.authorize(self.client.inner.client.get(url)).await?;
            let page: ListResponse = read_json(request.send().await?).await?;
            documents.extend(page.documents.into_iter().map(DocumentResponse::into_raw));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn run_query(
        &self,
        collection: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<RawDocument>, FirebaseError> {
        let url = self
            .client
            .url(&format!("{}:runQuery", self.client.documents_root()))?;
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field_path(&filter.field) },
                        "op": "EQUAL",
                        "value": value::encode(&filter.value),
                    }
                }
            }
        });

        let request = self
            .authorize(self.client.inner.client.post(url).json(&body))
            .await?;
        let items: Vec<RunQueryItem> = read_json(request.send().await?).await?;

        let mut documents: Vec<RawDocument> = items
            .into_iter()
            .filter_map(|item| item.document.map(DocumentResponse::into_raw))
            .collect();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    async fn commit_writes(&self, writes: &[Write]) -> Result<(), FirebaseError> {
        let url = self
            .client
            .url(&format!("{}:commit", self.client.documents_root()))?;
        let body = json!({
            "writes": writes.iter().map(|w| self.encode_write(w)).collect::<Vec<_>>()
        });

        let request = self
            .authorize(self.client.inner.client.post(url).json(&body))
            .await?;
        let _: Value = read_json(request.send().await?).await?;
        Ok(())
    }

    fn encode_write(&self, write: &Write) -> Value {
        let name = self.client.document_name(write.collection(), write.id());
        match write {
            Write::Set { fields, .. } => json!({
                "update": { "name": name, "fields": value::encode_fields(fields) }
            }),
            Write::Update { fields, .. } => json!({
                "update": { "name": name, "fields": value::encode_fields(fields) },
                "updateMask": { "fieldPaths": fields.keys().map(|k| field_path(k)).collect::<Vec<_>>() },
                "currentDocument": { "exists": true }
            }),
            Write::Delete { .. } => json!({ "delete": name }),
        }
    }
}

/// Quote a field name for use as a Firestore field path.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_owned()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<RawDocument>, StoreError> {
        Ok(self.get_document(collection, id).await?)
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<RawDocument>, StoreError> {
        let documents = match filter {
            Some(filter) => self.run_query(collection, filter).await?,
            None => self.list_all(collection).await?,
        };
        Ok(documents)
    }

    #[instrument(skip(self, writes), fields(writes = writes.len()))]
    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        Ok(self.commit_writes(&writes).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bluefitt_core::{FieldValue, Fields};

    use super::*;

    fn client() -> FirestoreClient {
        FirestoreClient::for_project("bluefitt-connect", None).unwrap()
    }

    #[test]
    fn test_document_names() {
        let client = client();
        assert_eq!(
            client.document_name("products", "A1"),
            "projects/bluefitt-connect/databases/(default)/documents/products/A1"
        );
        assert!(!client.is_emulator());
    }

    #[test]
    fn test_emulator_endpoint() {
        let client = FirestoreClient::for_project("demo", Some("127.0.0.1:8080")).unwrap();
        let url = client.url("projects/demo/databases/(default)/documents/users").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/v1/projects/demo/databases/(default)/documents/users"
        );
        assert!(client.is_emulator());
    }

    #[test]
    fn test_document_id_from_name() {
        let doc = DocumentResponse {
            name: "projects/p/databases/(default)/documents/users/uid-42".to_string(),
            fields: None,
        }
        .into_raw();
        assert_eq!(doc.id, "uid-42");
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn test_update_write_carries_mask_and_precondition() {
        let store = client().anonymous();
        let mut fields = Fields::new();
        fields.insert("role".to_string(), FieldValue::from("admin"));
        let encoded = store.encode_write(&Write::Update {
            collection: "users".to_string(),
            id: "u1".to_string(),
            fields,
        });

        assert_eq!(encoded["updateMask"]["fieldPaths"], json!(["role"]));
        assert_eq!(encoded["currentDocument"]["exists"], json!(true));
        assert_eq!(
            encoded["update"]["name"],
            json!("projects/bluefitt-connect/databases/(default)/documents/users/u1")
        );
    }

    #[test]
    fn test_delete_write() {
        let store = client().anonymous();
        let encoded = store.encode_write(&Write::Delete {
            collection: "users".to_string(),
            id: "u1".to_string(),
        });
        assert_eq!(
            encoded,
            json!({ "delete": "projects/bluefitt-connect/databases/(default)/documents/users/u1" })
        );
    }

    #[test]
    fn test_field_path_quoting() {
        assert_eq!(field_path("displayName"), "displayName");
        assert_eq!(field_path("photo-url"), "`photo-url`");
        assert_eq!(field_path("1st"), "`1st`");
    }
}
