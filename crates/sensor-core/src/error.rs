//! Error types shared by store backends and the HTTP layer.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure of a store-facing call.
///
/// The HTTP layer collapses every variant into a single "operation failed"
/// response; the variants exist for logging.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (connect, TLS, timeout).
    #[error("store unreachable: {0}")]
    Transport(String),

    /// The store answered with an error.
    #[error("{message}")]
    Backend {
        /// Machine-readable code reported by the store, e.g. `PERMISSION_DENIED`.
        code: Option<String>,
        message: String,
    },

    /// Obtaining credentials for the store failed.
    #[error("store authentication failed: {0}")]
    Auth(String),

    /// The store answered with something we could not interpret.
    #[error("unexpected store response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Error code reported by the backend, when there is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// A request body that cannot be stored as a reading.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("request body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}
