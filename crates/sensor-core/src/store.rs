//! The storage seam between the HTTP layer and a document backend.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::reading::{Payload, Reading};

/// Operations the gateway needs from the "sensor-data" collection.
///
/// Implementations must be safe to share across concurrently running
/// requests. None of them retry.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Append a new document holding `payload` plus a server timestamp.
    /// Returns the new document's id.
    async fn create(&self, payload: Payload) -> StoreResult<String>;

    /// Every document currently in the collection, in store order.
    async fn list_all(&self) -> StoreResult<Vec<Reading>>;

    /// Delete every document present when the call enumerates the
    /// collection, in one atomic batch. Returns how many were deleted.
    ///
    /// Documents written after enumeration survive.
    async fn delete_all(&self) -> StoreResult<usize>;

    /// Cheap round trip used at startup to verify connectivity.
    async fn probe(&self) -> StoreResult<()>;
}
