//! Firestore backend for the sensor gateway.
//!
//! Talks to the Firestore REST API (`v1`) directly:
//! - Service-account credentials from a key file or environment variables
//! - OAuth2 JWT-bearer token exchange with caching
//! - Document commit/list calls and the typed-value codec
//! - [`FirestoreStore`], the [`sensor_core::ReadingStore`] implementation

pub mod auth;
pub mod client;
pub mod credentials;
pub mod error;
pub mod store;
pub mod value;

pub use auth::{Authenticator, TokenProvider};
pub use client::{ClientOptions, Document, FirestoreClient, Write};
pub use credentials::ServiceAccountCredentials;
pub use error::{CredentialsError, FirestoreError};
pub use store::FirestoreStore;
