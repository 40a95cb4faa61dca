#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};

use sensor_core::{Payload, ReadingStore, StoreError};
use sensor_firestore::{ClientOptions, FirestoreClient, FirestoreStore, ServiceAccountCredentials};

const COMMIT_TIME: &str = "2024-05-01T12:00:00.123456Z";
const PAGE_SIZE: usize = 2;

/// Just enough of the Firestore REST surface to exercise the store.
#[derive(Default)]
struct FakeFirestore {
    docs: Vec<(String, Map<String, Value>)>,
    commits: usize,
    list_calls: usize,
    fail_with: Option<(StatusCode, Value)>,
    last_authorization: Option<String>,
}

type Shared = Arc<Mutex<FakeFirestore>>;

async fn handle(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut fake = state.lock().unwrap();
    fake.last_authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some((status, body)) = fake.fail_with.clone() {
        return (status, Json(body)).into_response();
    }

    let path = uri.path();
    if method == Method::POST && path.ends_with(":commit") {
        let request: Value = serde_json::from_slice(&body).unwrap();
        let writes = request["writes"].as_array().cloned().unwrap_or_default();
        fake.commits += 1;
        for write in &writes {
            if let Some(update) = write.get("update") {
                assert_eq!(write["currentDocument"]["exists"], json!(false));
                let name = update["name"].as_str().unwrap().to_string();
                let mut fields = update["fields"].as_object().cloned().unwrap_or_default();
                for transform in write["updateTransforms"].as_array().into_iter().flatten() {
                    assert_eq!(transform["setToServerValue"], "REQUEST_TIME");
                    let field = transform["fieldPath"].as_str().unwrap().to_string();
                    fields.insert(field, json!({ "timestampValue": COMMIT_TIME }));
                }
                fake.docs.push((name, fields));
            } else if let Some(name) = write["delete"].as_str() {
                fake.docs.retain(|(n, _)| n != name);
            }
        }
        let results: Vec<Value> = writes.iter().map(|_| json!({})).collect();
        return Json(json!({ "writeResults": results, "commitTime": COMMIT_TIME })).into_response();
    }

    if method == Method::GET && path.ends_with("/documents/sensor-data") {
        fake.list_calls += 1;
        let offset: usize = params
            .get("pageToken")
            .map_or(0, |t| t.parse().unwrap());
        let page: Vec<Value> = fake
            .docs
            .iter()
            .skip(offset)
            .take(PAGE_SIZE)
            .map(|(name, fields)| {
                json!({
                    "name": name,
                    "fields": fields,
                    "createTime": COMMIT_TIME,
                    "updateTime": COMMIT_TIME,
                })
            })
            .collect();
        let mut body = json!({});
        if !page.is_empty() {
            body["documents"] = Value::Array(page);
        }
        if offset + PAGE_SIZE < fake.docs.len() {
            body["nextPageToken"] = json!((offset + PAGE_SIZE).to_string());
        }
        return Json(body).into_response();
    }

    if method == Method::POST && path.ends_with(":listCollectionIds") {
        return Json(json!({ "collectionIds": ["sensor-data"] })).into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

async fn spawn_fake() -> (SocketAddr, Shared) {
    let state = Shared::default();
    let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn store_at(addr: SocketAddr) -> FirestoreStore {
    let creds = ServiceAccountCredentials::from_json(
        r#"{"project_id":"test-project","client_email":"svc@test-project","private_key":"unused"}"#,
    )
    .unwrap();
    let options = ClientOptions {
        emulator_host: Some(addr.to_string()),
        database: None,
    };
    FirestoreStore::new(FirestoreClient::new(&creds, &options).unwrap())
}

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("test payloads are objects"),
    }
}

#[tokio::test]
async fn create_then_list_round_trips() {
    let (addr, fake) = spawn_fake().await;
    let store = store_at(addr);

    let id = store
        .create(payload(json!({
            "device": "esp32-kitchen",
            "temperature": 21.5,
            "samples": [1, 2, 3],
            "timestamp": "client-supplied"
        })))
        .await
        .unwrap();

    let readings = store.list_all().await.unwrap();
    assert_eq!(readings.len(), 1);
    let reading = &readings[0];
    assert_eq!(reading.id, id);
    assert_eq!(reading.fields["device"], "esp32-kitchen");
    assert_eq!(reading.fields["temperature"], json!(21.5));
    assert_eq!(reading.fields["samples"], json!([1, 2, 3]));
    assert_eq!(reading.timestamp(), Some(&json!(COMMIT_TIME)));

    assert_eq!(
        fake.lock().unwrap().last_authorization.as_deref(),
        Some("Bearer owner")
    );
}

#[tokio::test]
async fn empty_payload_stores_only_timestamp() {
    let (addr, _fake) = spawn_fake().await;
    let store = store_at(addr);

    store.create(Payload::new()).await.unwrap();

    let readings = store.list_all().await.unwrap();
    let keys: Vec<&str> = readings[0].fields.keys().map(String::as_str).collect();
    assert_eq!(keys, ["timestamp"]);
}

#[tokio::test]
async fn list_follows_pagination() {
    let (addr, fake) = spawn_fake().await;
    let store = store_at(addr);

    let mut ids = Vec::new();
    for n in 0..5 {
        ids.push(store.create(payload(json!({ "n": n }))).await.unwrap());
    }

    let readings = store.list_all().await.unwrap();
    let listed: Vec<String> = readings.into_iter().map(|r| r.id).collect();
    assert_eq!(listed, ids);
    assert_eq!(fake.lock().unwrap().list_calls, 3);
}

#[tokio::test]
async fn delete_all_uses_one_commit() {
    let (addr, fake) = spawn_fake().await;
    let store = store_at(addr);
    for n in 0..3 {
        store.create(payload(json!({ "n": n }))).await.unwrap();
    }
    let commits_before = fake.lock().unwrap().commits;

    assert_eq!(store.delete_all().await.unwrap(), 3);
    assert_eq!(fake.lock().unwrap().commits, commits_before + 1);
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_all_on_empty_collection_is_zero() {
    let (addr, fake) = spawn_fake().await;
    let store = store_at(addr);

    assert_eq!(store.delete_all().await.unwrap(), 0);
    assert_eq!(fake.lock().unwrap().commits, 0);
}

#[tokio::test]
async fn api_error_surfaces_code_and_message() {
    let (addr, fake) = spawn_fake().await;
    let store = store_at(addr);
    fake.lock().unwrap().fail_with = Some((
        StatusCode::FORBIDDEN,
        json!({"error": {
            "code": 403,
            "message": "Missing or insufficient permissions.",
            "status": "PERMISSION_DENIED"
        }}),
    ));

    let err = store.create(Payload::new()).await.unwrap_err();
    assert_eq!(err.code(), Some("PERMISSION_DENIED"));
    assert_eq!(err.to_string(), "Missing or insufficient permissions.");

    let err = store.list_all().await.unwrap_err();
    assert!(matches!(err, StoreError::Backend { .. }));
}

#[tokio::test]
async fn unreachable_store_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = store_at(addr);
    let err = store.list_all().await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)), "got: {err}");
    assert!(store.probe().await.is_err());
}

#[tokio::test]
async fn probe_lists_collections() {
    let (addr, _fake) = spawn_fake().await;
    store_at(addr).probe().await.unwrap();
}
