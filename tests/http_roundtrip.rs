//! End-to-end: the reqwest client and the engine against an in-process
//! backend that speaks the `/api/aois` wire format (geometry as a string).

#![allow(clippy::float_cmp)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use geoscan::api::{AoiApi, CreateRequest, HttpAoiApi};
use geoscan::config::ApiConfig;
use geoscan::doc::AoiId;
use geoscan::draw::DrawEvent;
use geoscan::engine::AoiEngine;
use geoscan::error::{AoiError, NetworkError};
use geoscan::map::{DrawTool, DrawnShape, HeadlessMap, MapHandle};
use geoscan::notify::{NoticeLog, Severity};

// =============================================================
// Fake backend
// =============================================================

#[derive(Clone, Default)]
struct Backend {
    rows: Arc<Mutex<Vec<Value>>>,
    next_id: Arc<Mutex<i64>>,
}

type Reply = (StatusCode, Json<Value>);

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn list_aois(State(backend): State<Backend>) -> Reply {
    let rows = backend.rows.lock().unwrap().clone();
    (StatusCode::OK, Json(json!({ "message": "Successfully fetched AOIs", "aois": rows })))
}

async fn create_aoi(State(backend): State<Backend>, Json(body): Json<Value>) -> Reply {
    let name = body["name"].as_str().unwrap_or_default().to_owned();
    let geometry = body["geometry"].as_str().unwrap_or_default().to_owned();
    if name.is_empty() || geometry.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Bad Request: Name and geometry cannot be empty" })));
    }
    let id = {
        let mut next = backend.next_id.lock().unwrap();
        *next += 1;
        *next
    };
    backend.rows.lock().unwrap().push(json!({
        "id": id,
        "name": name,
        "description": body["description"],
        "geometry": geometry,
        "createdAt": "2024-06-01T08:00:00Z",
    }));
    (StatusCode::CREATED, Json(json!({ "message": "AOI created", "id": id })))
}

async fn get_aoi(State(backend): State<Backend>, Path(id): Path<i64>) -> Reply {
    let rows = backend.rows.lock().unwrap();
    match rows.iter().find(|row| row["id"] == id) {
        Some(row) => (StatusCode::OK, Json(json!({ "message": "AOI fetched successfully", "aoi": row }))),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "AOI not found" }))),
    }
}

async fn delete_aoi(State(backend): State<Backend>, Path(id): Path<i64>) -> Reply {
    let mut rows = backend.rows.lock().unwrap();
    let before = rows.len();
    rows.retain(|row| row["id"] != id);
    if rows.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "AOI not found" })));
    }
    (StatusCode::OK, Json(json!({ "message": "AOI deleted" })))
}

/// Serve the fake backend on an ephemeral port; returns its base URL.
async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/aois", get(list_aois).post(create_aoi))
        .route("/api/aois/{id}", get(get_aoi).delete(delete_aoi))
        .with_state(Backend::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> Arc<HttpAoiApi> {
    Arc::new(HttpAoiApi::new(&ApiConfig::new(base_url).unwrap()).unwrap())
}

fn rectangle(west: f64, south: f64, east: f64, north: f64) -> geojson::Feature {
    let ring = vec![
        vec![west, south],
        vec![east, south],
        vec![east, north],
        vec![west, north],
        vec![west, south],
    ];
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::Polygon(vec![ring]))),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

// =============================================================
// Client
// =============================================================

#[tokio::test]
async fn health_reports_healthy() {
    let api = client(&spawn_backend().await);
    assert_eq!(api.health().await.unwrap(), "healthy");
}

#[tokio::test]
async fn server_message_surfaces_on_rejection() {
    let api = client(&spawn_backend().await);
    let request = CreateRequest { name: String::new(), description: String::new(), geometry: "{}".into() };

    let err = api.create(&request).await.unwrap_err();
    assert_eq!(
        err,
        NetworkError::Status { status: 400, message: "Bad Request: Name and geometry cannot be empty".into() }
    );
}

#[tokio::test]
async fn unknown_id_is_404() {
    let api = client(&spawn_backend().await);
    let err = api.get(&AoiId::Int(404)).await.unwrap_err();
    assert_eq!(err, NetworkError::Status { status: 404, message: "AOI not found".into() });
}

#[tokio::test]
async fn unreachable_backend_is_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}")).list().await.unwrap_err();
    assert!(matches!(err, NetworkError::Request(_)));
}

// =============================================================
// Engine over HTTP
// =============================================================

#[tokio::test]
async fn draw_save_refresh_delete_round_trip() {
    let base_url = spawn_backend().await;
    let map = MapHandle::new(HeadlessMap::new(1024.0, 768.0));
    let log = Arc::new(NoticeLog::new());
    let mut engine = AoiEngine::new(map.clone(), client(&base_url), log.clone());

    engine.begin_drawing(DrawTool::Rectangle).unwrap();
    let shape = DrawnShape { tool: DrawTool::Rectangle, feature: rectangle(0.0, 0.0, 1.0, 1.0) };
    map.borrow_mut().emit_draw_created(&shape);
    assert!(matches!(engine.poll_drawing()[..], [DrawEvent::NamingRequested { .. }]));

    let saved = engine.save("Test field", "drawn in test").await.unwrap();
    assert_eq!(saved.id, AoiId::Int(1));
    assert_eq!(saved.area, 12363.72);
    assert_eq!(map.borrow().layer_count(), 1);

    let refreshed = engine.refresh().await.unwrap();
    assert_eq!(refreshed.len(), 1);
    assert_eq!(refreshed[0].id, saved.id);
    assert_eq!(refreshed[0].name, "Test field");
    assert_eq!(refreshed[0].description, "drawn in test");
    assert_eq!(refreshed[0].geometry.geometry, shape.feature.geometry);
    assert_eq!(refreshed[0].center, [0.5, 0.5]);
    assert_eq!(refreshed[0].created_at.as_deref(), Some("2024-06-01T08:00:00Z"));

    let fetched = engine.gateway().fetch(&saved.id).await.unwrap();
    assert_eq!(fetched.name, "Test field");

    engine.delete(&saved.id).await.unwrap();
    assert!(engine.records().is_empty());
    assert_eq!(map.borrow().layer_count(), 0);
    assert_eq!(
        log.messages(Severity::Success),
        vec!["AOI saved successfully".to_string(), "AOI deleted successfully".to_string()]
    );

    assert!(engine.refresh().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_refresh_keeps_layers() {
    let base_url = spawn_backend().await;
    let map = MapHandle::new(HeadlessMap::new(800.0, 600.0));
    let api = client(&base_url);
    api.create(&CreateRequest {
        name: "kept".into(),
        description: String::new(),
        geometry: r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#.into(),
    })
    .await
    .unwrap();
    let mut engine = AoiEngine::new(map.clone(), api, Arc::new(NoticeLog::new()));
    engine.refresh().await.unwrap();

    let mut broken = AoiEngine::new(map.clone(), client("http://127.0.0.1:1"), Arc::new(NoticeLog::new()));
    assert!(matches!(broken.refresh().await, Err(AoiError::Network(_))));
    assert_eq!(engine.records().len(), 1);
    assert_eq!(engine.layers().layer_count(), 1);
}
