//! Service-account credentials.
//!
//! One credential type with three ways in: a Google Cloud JSON key file, the
//! full ten-variable `FIREBASE_*` bundle, or the minimal three-variable form
//! (project id, client email, private key).

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::CredentialsError;

/// Token endpoint used when the credentials do not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
const CLIENT_EMAIL: &str = "FIREBASE_CLIENT_EMAIL";
const PRIVATE_KEY: &str = "FIREBASE_PRIVATE_KEY";

/// Variables required when no bundle-only variable is present.
pub const MINIMAL_ENV_VARS: [&str; 3] = [PROJECT_ID, CLIENT_EMAIL, PRIVATE_KEY];

/// The full credential bundle. Setting any variable outside
/// [`MINIMAL_ENV_VARS`] makes all of these required.
pub const BUNDLE_ENV_VARS: [&str; 10] = [
    "FIREBASE_TYPE",
    PROJECT_ID,
    "FIREBASE_PRIVATE_KEY_ID",
    PRIVATE_KEY,
    CLIENT_EMAIL,
    "FIREBASE_CLIENT_ID",
    "FIREBASE_AUTH_URI",
    "FIREBASE_TOKEN_URI",
    "FIREBASE_AUTH_PROVIDER_CERT_URL",
    "FIREBASE_CLIENT_CERT_URL",
];

/// Service account credentials, in the shape of a Google Cloud JSON key file.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountCredentials {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,

    pub project_id: String,

    /// Sent as the `kid` header of signed assertions.
    #[serde(default)]
    pub private_key_id: Option<String>,

    /// RSA private key in PEM format, newlines already normalised.
    pub private_key: String,

    pub client_email: String,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub auth_uri: Option<String>,

    #[serde(default)]
    pub token_uri: Option<String>,

    #[serde(default)]
    pub auth_provider_x509_cert_url: Option<String>,

    #[serde(default)]
    pub client_x509_cert_url: Option<String>,
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl ServiceAccountCredentials {
    /// Load credentials from a JSON key file.
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let content = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let creds = Self::from_json(&content)?;
        debug!(path = %path.display(), project_id = %creds.project_id, "Loaded credentials file");
        Ok(creds)
    }

    /// Parse credentials from the contents of a JSON key file.
    pub fn from_json(content: &str) -> Result<Self, CredentialsError> {
        let mut creds: Self = serde_json::from_str(content)?;
        creds.private_key = normalize_private_key(&creds.private_key);
        Ok(creds)
    }

    /// Load credentials from the process environment.
    pub fn from_env() -> Result<Self, CredentialsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load credentials through `lookup`, which maps a variable name to its
    /// value. Empty values count as unset.
    ///
    /// Every missing variable is reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CredentialsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let full_bundle = BUNDLE_ENV_VARS
            .iter()
            .copied()
            .any(|name| !MINIMAL_ENV_VARS.contains(&name) && get(name).is_some());
        let required: &[&'static str] = if full_bundle {
            &BUNDLE_ENV_VARS
        } else {
            &MINIMAL_ENV_VARS
        };

        let missing: Vec<&'static str> = required
            .iter()
            .copied()
            .filter(|name| get(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(CredentialsError::Missing(missing));
        }

        let required_value = |name: &str| get(name).unwrap_or_default();
        debug!(full_bundle, "Loaded credentials from environment");

        Ok(Self {
            key_type: get("FIREBASE_TYPE"),
            project_id: required_value(PROJECT_ID),
            private_key_id: get("FIREBASE_PRIVATE_KEY_ID"),
            private_key: normalize_private_key(&required_value(PRIVATE_KEY)),
            client_email: required_value(CLIENT_EMAIL),
            client_id: get("FIREBASE_CLIENT_ID"),
            auth_uri: get("FIREBASE_AUTH_URI"),
            token_uri: get("FIREBASE_TOKEN_URI"),
            auth_provider_x509_cert_url: get("FIREBASE_AUTH_PROVIDER_CERT_URL"),
            client_x509_cert_url: get("FIREBASE_CLIENT_CERT_URL"),
        })
    }

    /// The OAuth2 token endpoint for these credentials.
    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

/// Replace literal `\n` escape sequences with real newlines.
///
/// Keys pasted into environment dashboards usually arrive on a single line.
pub fn normalize_private_key(key: &str) -> String {
    key.replace("\\n", "\n")
}
