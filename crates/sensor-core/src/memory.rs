//! In-process `ReadingStore` backed by a vector.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;
use crate::reading::{Payload, Reading, TIMESTAMP_FIELD, without_timestamp};
use crate::store::ReadingStore;

/// Keeps readings in memory, in insertion order.
///
/// Mirrors the semantics of a remote document store: ids and timestamps are
/// assigned on write, and `delete_all` enumerates before it deletes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: RwLock<Vec<Reading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }

    async fn snapshot_ids(&self) -> HashSet<String> {
        self.readings
            .read()
            .await
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    async fn remove_ids(&self, ids: &HashSet<String>) -> usize {
        let mut readings = self.readings.write().await;
        let before = readings.len();
        readings.retain(|r| !ids.contains(&r.id));
        before - readings.len()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn create(&self, payload: Payload) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut fields = without_timestamp(payload);
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        fields.insert(TIMESTAMP_FIELD.to_string(), Value::String(now));

        self.readings
            .write()
            .await
            .push(Reading::new(id.clone(), fields));
        debug!(id = %id, "Reading stored in memory");
        Ok(id)
    }

    async fn list_all(&self) -> StoreResult<Vec<Reading>> {
        Ok(self.readings.read().await.clone())
    }

    async fn delete_all(&self) -> StoreResult<usize> {
        let ids = self.snapshot_ids().await;
        Ok(self.remove_ids(&ids).await)
    }

    async fn probe(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test payloads are objects"),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamp() {
        let store = MemoryStore::new();
        let id = store
            .create(payload(json!({"humidity": 40, "timestamp": "client"})))
            .await
            .unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].fields["humidity"], json!(40));
        let ts = all[0].timestamp().and_then(Value::as_str).unwrap();
        assert_ne!(ts, "client", "server timestamp must win");
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[tokio::test]
    async fn delete_all_reports_count() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store.create(payload(json!({ "n": i }))).await.unwrap();
        }
        assert_eq!(store.delete_all().await.unwrap(), 3);
        assert!(store.is_empty().await);
        assert_eq!(store.delete_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn write_between_enumeration_and_delete_survives() {
        let store = MemoryStore::new();
        store.create(payload(json!({"n": 1}))).await.unwrap();

        let ids = store.snapshot_ids().await;
        let late = store.create(payload(json!({"n": 2}))).await.unwrap();
        assert_eq!(store.remove_ids(&ids).await, 1);

        let remaining = store.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, late);
    }
}
