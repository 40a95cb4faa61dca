//! Sensor Gateway
//!
//! HTTP service that accepts readings from hardware sensors and keeps them in
//! the Firestore "sensor-data" collection.

use clap::Parser;
use tracing::{error, info};

use sensor_core::tracing_init::init_tracing;
use sensor_gateway::config::Args;
use sensor_gateway::routes::{AppState, build_router};
use sensor_gateway::startup::connect_store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("sensor_gateway=info,sensor_firestore=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        "Starting sensor-gateway"
    );

    let store = match connect_store(&args).await {
        Ok(store) => store,
        Err(e) => {
            error!("Startup failed: {e:#}");
            return Err(e);
        }
    };

    let addr = args.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Sensor Data API listening");

    axum::serve(listener, build_router(AppState::new(store)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Sensor gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
