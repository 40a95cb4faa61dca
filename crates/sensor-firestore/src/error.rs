//! Error types for the Firestore backend.

use sensor_core::StoreError;
use thiserror::Error;

/// Failure to assemble service-account credentials.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Required environment variables are unset or empty.
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("failed to read credentials file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse credentials JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The private key is not a usable RSA PEM key.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

/// Errors from the Firestore REST client.
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Firestore answered with a non-success status.
    #[error("Firestore API error ({status}): {message}")]
    Api {
        status: u16,
        /// Canonical status string from the error envelope, e.g. `NOT_FOUND`.
        code: Option<String>,
        message: String,
    },

    #[error("access token request failed: {0}")]
    Token(String),

    #[error("failed to decode Firestore response: {0}")]
    Decode(String),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),
}

impl From<FirestoreError> for StoreError {
    fn from(e: FirestoreError) -> Self {
        match e {
            FirestoreError::Http(e) if e.is_decode() => Self::Decode(e.to_string()),
            FirestoreError::Http(e) => Self::Transport(e.to_string()),
            FirestoreError::Api { code, message, .. } => Self::Backend { code, message },
            FirestoreError::Token(msg) => Self::Auth(msg),
            FirestoreError::Credentials(e) => Self::Auth(e.to_string()),
            FirestoreError::Decode(msg) => Self::Decode(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_lists_every_variable() {
        let err = CredentialsError::Missing(vec!["FIREBASE_PROJECT_ID", "FIREBASE_PRIVATE_KEY"]);
        assert_eq!(
            err.to_string(),
            "missing required environment variables: FIREBASE_PROJECT_ID, FIREBASE_PRIVATE_KEY"
        );
    }

    #[test]
    fn api_error_keeps_code_for_store_error() {
        let err: StoreError = FirestoreError::Api {
            status: 403,
            code: Some("PERMISSION_DENIED".into()),
            message: "Missing or insufficient permissions.".into(),
        }
        .into();
        assert_eq!(err.code(), Some("PERMISSION_DENIED"));
        assert_eq!(err.to_string(), "Missing or insufficient permissions.");
    }

    #[test]
    fn token_error_becomes_auth_error() {
        let err: StoreError = FirestoreError::Token("invalid_grant".into()).into();
        assert!(matches!(err, StoreError::Auth(ref m) if m == "invalid_grant"));
    }
}
