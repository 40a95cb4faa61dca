//! OAuth2 access tokens for the Firestore API.
//!
//! Service accounts authenticate with the JWT-bearer grant: sign a short
//! assertion with the account's RSA key, trade it at the token endpoint for
//! an access token, and reuse that token until shortly before it expires.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::credentials::ServiceAccountCredentials;
use crate::error::{CredentialsError, FirestoreError};

/// OAuth scope granting read/write access to Firestore.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for signed assertions (the maximum Google accepts).
const ASSERTION_TTL_SECS: i64 = 3600;

/// Cached tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Bearer token the Firestore emulator accepts for privileged access.
const EMULATOR_TOKEN: &str = "owner";

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

const fn default_expires_in() -> i64 {
    ASSERTION_TTL_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

impl CachedToken {
    const fn is_fresh(&self, now: i64) -> bool {
        self.expires_at - REFRESH_MARGIN_SECS > now
    }
}

/// Issues and caches access tokens for one service account.
pub struct TokenProvider {
    http: reqwest::Client,
    encoding_key: EncodingKey,
    key_id: Option<String>,
    client_email: String,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    /// Build a provider from service-account credentials.
    ///
    /// Fails if the private key is not an RSA PEM key, so a bad key is
    /// caught at startup rather than on the first request.
    pub fn new(
        credentials: &ServiceAccountCredentials,
        http: reqwest::Client,
    ) -> Result<Self, CredentialsError> {
        let encoding_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| CredentialsError::InvalidKey(e.to_string()))?;

        Ok(Self {
            http,
            encoding_key,
            key_id: credentials.private_key_id.clone(),
            client_email: credentials.client_email.clone(),
            token_uri: credentials.token_uri().to_string(),
            cached: Mutex::new(None),
        })
    }

    /// Return a valid access token, fetching a new one if the cached token
    /// is missing or about to expire.
    ///
    /// Concurrent callers wait on the same refresh.
    pub async fn access_token(&self) -> Result<String, FirestoreError> {
        let mut cached = self.cached.lock().await;
        let now = now_secs();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let fresh = self.fetch(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn sign_assertion(&self, now: i64) -> Result<String, FirestoreError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key_id);

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| FirestoreError::Token(format!("failed to sign assertion: {e}")))
    }

    async fn fetch(&self, now: i64) -> Result<CachedToken, FirestoreError> {
        let assertion = self.sign_assertion(now)?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| FirestoreError::Token(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            warn!(status = status.as_u16(), body = %body, "Token endpoint returned error");
            return Err(FirestoreError::Token(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| FirestoreError::Token(format!("invalid token response: {e}")))?;

        debug!(expires_in = token.expires_in, "Obtained Firestore access token");
        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}

/// How Firestore requests are authorised.
#[derive(Debug)]
pub enum Authenticator {
    /// Production: OAuth2 tokens for a service account.
    ServiceAccount(TokenProvider),
    /// Local emulator: fixed bearer, no token exchange.
    Emulator,
}

impl Authenticator {
    /// Value for the `Authorization` header.
    pub async fn authorization(&self) -> Result<String, FirestoreError> {
        match self {
            Self::ServiceAccount(provider) => {
                let token = provider.access_token().await?;
                Ok(format!("Bearer {token}"))
            }
            Self::Emulator => Ok(format!("Bearer {EMULATOR_TOKEN}")),
        }
    }
}

fn now_secs() -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    secs
}
