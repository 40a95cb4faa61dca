//! Firestore REST API (`v1`) client.
//!
//! Covers the handful of document calls the gateway needs: atomic commits
//! (create with server timestamp, batched delete), paginated collection
//! listing, and listing collection ids as a connectivity probe.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::auth::{Authenticator, TokenProvider};
use crate::credentials::ServiceAccountCredentials;
use crate::error::FirestoreError;

/// Production API root.
pub const FIRESTORE_API_ROOT: &str = "https://firestore.googleapis.com/v1";

/// Database id used when none is configured.
pub const DEFAULT_DATABASE: &str = "(default)";

/// Documents requested per page while listing a collection.
const LIST_PAGE_SIZE: u32 = 300;

/// Where and how to reach Firestore.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// `host:port` of a Firestore emulator. Switches to plain HTTP and the
    /// emulator's fixed bearer token.
    pub emulator_host: Option<String>,

    /// Database id; [`DEFAULT_DATABASE`] when unset.
    pub database: Option<String>,
}

/// A document as returned by `get`/`list` calls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name, `projects/{p}/databases/{d}/documents/{path}`.
    pub name: String,

    /// Typed field values; absent for an empty document.
    #[serde(default)]
    pub fields: Map<String, Value>,

    #[serde(default)]
    pub create_time: Option<String>,

    #[serde(default)]
    pub update_time: Option<String>,
}

impl Document {
    /// The document id (last path segment of the resource name).
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// One write inside a commit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    #[serde(flatten)]
    pub operation: WriteOperation,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_document: Option<Precondition>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteOperation {
    Update(DocumentUpdate),
    /// Resource name of the document to delete.
    Delete(String),
}

#[derive(Debug, Serialize)]
pub struct DocumentUpdate {
    pub name: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct Precondition {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    pub field_path: String,
    pub set_to_server_value: ServerValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerValue {
    /// The time the commit was processed.
    RequestTime,
}

impl Write {
    /// Create `name` with `fields` (already Firestore-encoded), failing if it
    /// exists, and set `timestamp_field` to the commit time.
    pub fn create(name: String, fields: Map<String, Value>, timestamp_field: &str) -> Self {
        Self {
            operation: WriteOperation::Update(DocumentUpdate { name, fields }),
            current_document: Some(Precondition { exists: false }),
            update_transforms: vec![FieldTransform {
                field_path: timestamp_field.to_string(),
                set_to_server_value: ServerValue::RequestTime,
            }],
        }
    }

    /// Delete the document with resource name `name`.
    pub const fn delete(name: String) -> Self {
        Self {
            operation: WriteOperation::Delete(name),
            current_document: None,
            update_transforms: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    writes: &'a [Write],
}

/// Outcome of an atomic commit.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub write_results: Vec<Value>,
    #[serde(default)]
    pub commit_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsResponse {
    #[serde(default)]
    collection_ids: Vec<String>,
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Build an HTTP client, installing the `ring` crypto provider first.
///
/// reqwest is built with `rustls-no-provider`; the `Err` from
/// `install_default` only means a provider is already installed.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    reqwest::Client::builder().build()
}

/// Firestore REST client bound to one project and database.
#[derive(Debug)]
pub struct FirestoreClient {
    http: reqwest::Client,
    api_root: String,
    /// `projects/{project}/databases/{database}`.
    database_path: String,
    auth: Authenticator,
}

impl FirestoreClient {
    /// Create a client for the project named in `credentials`.
    ///
    /// # Errors
    ///
    /// Returns `FirestoreError::Credentials` if the private key is unusable,
    /// or `FirestoreError::Http` if the HTTP client cannot be built.
    pub fn new(
        credentials: &ServiceAccountCredentials,
        options: &ClientOptions,
    ) -> Result<Self, FirestoreError> {
        let http = http_client()?;
        let database = options.database.as_deref().unwrap_or(DEFAULT_DATABASE);

        let (api_root, auth) = match &options.emulator_host {
            Some(host) => (format!("http://{host}/v1"), Authenticator::Emulator),
            None => (
                FIRESTORE_API_ROOT.to_string(),
                Authenticator::ServiceAccount(TokenProvider::new(credentials, http.clone())?),
            ),
        };

        let database_path = format!(
            "projects/{}/databases/{database}",
            credentials.project_id
        );

        debug!(
            project_id = %credentials.project_id,
            database,
            emulator = options.emulator_host.is_some(),
            "Firestore client initialized"
        );

        Ok(Self {
            http,
            api_root,
            database_path,
            auth,
        })
    }

    /// Resource name of the documents root.
    pub fn documents_root(&self) -> String {
        format!("{}/documents", self.database_path)
    }

    /// Resource name of a document in a top-level collection.
    pub fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_root())
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.api_root)
    }

    /// Apply `writes` atomically: all succeed or none do.
    pub async fn commit(&self, writes: &[Write]) -> Result<CommitResponse, FirestoreError> {
        let url = self.url(&format!("{}:commit", self.documents_root()));
        let request = self.http.post(&url).json(&CommitRequest { writes });
        let response: CommitResponse = self.send(request).await?;
        debug!(
            writes = writes.len(),
            commit_time = ?response.commit_time,
            "Firestore commit applied"
        );
        Ok(response)
    }

    /// Every document in a top-level collection, following pagination to the
    /// end.
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, FirestoreError> {
        let url = self.url(&format!("{}/{collection}", self.documents_root()));
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListDocumentsResponse = self.send(request).await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(collection, count = documents.len(), "Listed Firestore documents");
        Ok(documents)
    }

    /// Ids of the top-level collections in the database (first page only).
    pub async fn list_collection_ids(&self) -> Result<Vec<String>, FirestoreError> {
        let url = self.url(&format!("{}:listCollectionIds", self.documents_root()));
        let request = self.http.post(&url).json(&serde_json::json!({}));
        let response: ListCollectionIdsResponse = self.send(request).await?;
        Ok(response.collection_ids)
    }

    /// Authorise, send, check status, and decode the JSON body.
    async fn send<T>(&self, request: reqwest::RequestBuilder) -> Result<T, FirestoreError>
    where
        T: serde::de::DeserializeOwned,
    {
        let authorization = self.auth.authorization().await?;
        let response = request
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        warn!(status = status.as_u16(), body = %body, "Firestore API returned error");
        Err(api_error(status, &body))
    }
}

fn api_error(status: reqwest::StatusCode, body: &str) -> FirestoreError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => FirestoreError::Api {
            status: status.as_u16(),
            code: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => FirestoreError::Api {
            status: status.as_u16(),
            code: None,
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            } else {
                body.to_string()
            },
        },
    }
}
