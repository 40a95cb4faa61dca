//! Sensor gateway core library
//!
//! Shared functionality for the gateway crates:
//! - Reading model and schema-less payload parsing
//! - The `ReadingStore` seam implemented by storage backends
//! - An in-memory store for local runs and tests
//! - Common error types and tracing initialisation

pub mod error;
pub mod memory;
pub mod reading;
pub mod store;
pub mod tracing_init;

pub use error::{PayloadError, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use reading::{COLLECTION, Payload, Reading, TIMESTAMP_FIELD};
#[cfg(any(test, feature = "testing"))]
pub use store::MockReadingStore;
pub use store::ReadingStore;
