use std::sync::Arc;

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use sensor_core::reading::parse_payload;
use sensor_core::{Reading, ReadingStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReadingStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }
}

/// Build the gateway router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/sensor-data/send", post(send))
        .route("/api/sensor-data/download", get(download))
        .route("/api/sensor-data/del", delete(delete_all))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Created {
    success: bool,
    id: String,
    message: &'static str,
}

#[derive(Serialize)]
struct Listing {
    success: bool,
    count: usize,
    data: Vec<Reading>,
}

#[derive(Serialize)]
struct Deleted {
    success: bool,
    message: String,
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    error: &'static str,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
}

fn failure(status: StatusCode, error: &'static str, details: String, code: Option<String>) -> Response {
    (
        status,
        Json(Failure {
            success: false,
            error,
            details,
            code,
        }),
    )
        .into_response()
}

/// `POST /api/sensor-data/send`: store the body as a new reading.
pub async fn send(State(state): State<AppState>, body: Bytes) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Rejected sensor data payload");
            return failure(
                StatusCode::BAD_REQUEST,
                "Invalid sensor data payload",
                e.to_string(),
                None,
            );
        }
    };

    match state.store.create(payload).await {
        Ok(id) => {
            info!(id = %id, "Sensor data stored");
            (
                StatusCode::CREATED,
                Json(Created {
                    success: true,
                    id,
                    message: "Sensor data stored successfully",
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, code = ?e.code(), "Error storing sensor data");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store sensor data",
                e.to_string(),
                e.code().map(str::to_string),
            )
        }
    }
}

/// `GET /api/sensor-data/download`: every stored reading.
pub async fn download(State(state): State<AppState>) -> Response {
    match state.store.list_all().await {
        Ok(data) => Json(Listing {
            success: true,
            count: data.len(),
            data,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Error retrieving sensor data");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve sensor data",
                e.to_string(),
                None,
            )
        }
    }
}

/// `DELETE /api/sensor-data/del`: delete every reading in one batch.
pub async fn delete_all(State(state): State<AppState>) -> Response {
    match state.store.delete_all().await {
        Ok(deleted) => Json(Deleted {
            success: true,
            message: format!("Deleted {deleted} records"),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Error deleting sensor data");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete sensor data",
                e.to_string(),
                None,
            )
        }
    }
}

/// `GET /health`: liveness only; never touches the store.
pub async fn health() -> impl IntoResponse {
    Json(Health {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// `GET /`: describe the available endpoints.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Hardware Sensor Data API",
        "endpoints": {
            "POST /api/sensor-data/send": "Store sensor data",
            "GET /api/sensor-data/download": "Download all sensor data",
            "DELETE /api/sensor-data/del": "Delete all sensor data",
            "GET /health": "Health check",
        }
    }))
}
