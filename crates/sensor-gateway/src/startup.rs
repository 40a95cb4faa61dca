//! Store construction at process start.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use sensor_core::ReadingStore;
use sensor_firestore::{FirestoreClient, FirestoreStore};

use crate::config::Args;

/// Build the Firestore-backed store and, unless disabled, verify the
/// database is reachable.
///
/// Any error here is meant to stop the process before it binds a listener.
pub async fn connect_store(args: &Args) -> anyhow::Result<Arc<dyn ReadingStore>> {
    let credentials = args
        .load_credentials()
        .context("failed to load Firestore credentials")?;
    let client = FirestoreClient::new(&credentials, &args.client_options())
        .context("failed to create Firestore client")?;
    let store = FirestoreStore::new(client);

    if args.startup_probe {
        store
            .probe()
            .await
            .context("Firestore connectivity check failed")?;
        info!(project_id = %credentials.project_id, "Firestore connectivity check passed");
    }

    Ok(Arc::new(store))
}
