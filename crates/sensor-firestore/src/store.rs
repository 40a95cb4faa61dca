//! `ReadingStore` backed by a Firestore collection.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use sensor_core::reading::without_timestamp;
use sensor_core::{COLLECTION, Payload, Reading, ReadingStore, StoreResult, TIMESTAMP_FIELD};

use crate::client::{FirestoreClient, Write};
use crate::value::{decode_fields, encode_fields};

/// Stores readings as documents of one Firestore collection.
#[derive(Debug)]
pub struct FirestoreStore {
    client: FirestoreClient,
    collection: String,
}

impl FirestoreStore {
    /// A store over the "sensor-data" collection.
    pub fn new(client: FirestoreClient) -> Self {
        Self::with_collection(client, COLLECTION)
    }

    pub fn with_collection(client: FirestoreClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }
}

/// Random document id, fixed by the writer like Firestore's own client SDKs do.
fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl ReadingStore for FirestoreStore {
    #[instrument(skip_all, fields(collection = %self.collection))]
    async fn create(&self, payload: Payload) -> StoreResult<String> {
        let id = new_document_id();
        let name = self.client.document_name(&self.collection, &id);
        let fields = encode_fields(&without_timestamp(payload));

        self.client
            .commit(&[Write::create(name, fields, TIMESTAMP_FIELD)])
            .await?;
        debug!(id = %id, "Reading stored");
        Ok(id)
    }

    #[instrument(skip_all, fields(collection = %self.collection))]
    async fn list_all(&self) -> StoreResult<Vec<Reading>> {
        let documents = self.client.list_documents(&self.collection).await?;
        let readings = documents
            .into_iter()
            .map(|doc| {
                let id = doc.id().to_string();
                decode_fields(doc.fields).map(|fields| Reading::new(id, fields))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(readings)
    }

    /// Enumerates, then deletes what it saw in one commit. A reading written
    /// between the two steps is not in the batch and survives.
    #[instrument(skip_all, fields(collection = %self.collection))]
    async fn delete_all(&self) -> StoreResult<usize> {
        let documents = self.client.list_documents(&self.collection).await?;
        if documents.is_empty() {
            return Ok(0);
        }

        let writes: Vec<Write> = documents
            .into_iter()
            .map(|doc| Write::delete(doc.name))
            .collect();
        self.client.commit(&writes).await?;

        info!(deleted = writes.len(), "Deleted all readings");
        Ok(writes.len())
    }

    async fn probe(&self) -> StoreResult<()> {
        let collections = self.client.list_collection_ids().await?;
        debug!(?collections, "Firestore connectivity probe succeeded");
        Ok(())
    }
}
