//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use geojson::{Feature, Geometry, Value};
use tokio::sync::Notify;

use crate::api::{AoiApi, CreateRequest, WireAoi};
use crate::doc::{AoiId, AoiRecord};
use crate::error::NetworkError;
use crate::metrics;

/// Axis-aligned rectangle feature, closed counter-clockwise ring.
pub fn rect_feature(west: f64, south: f64, east: f64, north: f64) -> Feature {
    polygon_feature(&[[west, south], [east, south], [east, north], [west, north], [west, south]])
}

/// Single-ring polygon feature from `[lon, lat]` pairs.
pub fn polygon_feature(ring: &[[f64; 2]]) -> Feature {
    let ring = ring.iter().map(|p| p.to_vec()).collect();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

/// Confirmed record over a rectangle, metrics derived from the geometry.
pub fn record(id: i64, name: &str, bounds: [f64; 4]) -> AoiRecord {
    let geometry = rect_feature(bounds[0], bounds[1], bounds[2], bounds[3]);
    let metrics = metrics::compute(&geometry).unwrap();
    AoiRecord {
        id: AoiId::Int(id),
        name: name.to_owned(),
        description: String::new(),
        geometry,
        area: metrics.area,
        center: metrics.center,
        created_at: Some("2024-05-01T12:00:00Z".to_owned()),
        updated_at: None,
    }
}

// =============================================================================
// FAKE BACKEND
// =============================================================================

/// In-memory `AoiApi`. Identities are assigned when a create is received, so
/// a held-back create keeps the identity it was given.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    /// Creates whose name is listed here wait on `gate` before answering.
    held: Mutex<Vec<String>>,
    pub gate: Notify,
}

#[derive(Default)]
struct FakeState {
    rows: Vec<WireAoi>,
    next_id: i64,
    fail: Option<NetworkError>,
    creates: Vec<CreateRequest>,
    deletes: Vec<AoiId>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a listed row with a string-encoded geometry.
    pub fn seed(&self, id: i64, name: &str, feature: &Feature) {
        let geometry = crate::api::encode_geometry(feature).unwrap();
        self.state.lock().unwrap().rows.push(WireAoi {
            id: AoiId::Int(id),
            name: Some(name.to_owned()),
            description: Some(String::new()),
            geometry: Some(serde_json::Value::String(geometry)),
            area: None,
            center: None,
            created_at: Some("2024-05-01T12:00:00Z".to_owned()),
            updated_at: None,
        });
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(id);
    }

    /// Seed a raw row as-is.
    pub fn seed_raw(&self, row: WireAoi) {
        self.state.lock().unwrap().rows.push(row);
    }

    /// Make every following call fail with `error` (or succeed again with `None`).
    pub fn fail_with(&self, error: Option<NetworkError>) {
        self.state.lock().unwrap().fail = error;
    }

    /// Hold creates named `name` until `gate` is notified.
    pub fn hold(&self, name: &str) {
        self.held.lock().unwrap().push(name.to_owned());
    }

    pub fn clear_rows(&self) {
        self.state.lock().unwrap().rows.clear();
    }

    pub fn creates(&self) -> Vec<CreateRequest> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn deletes(&self) -> Vec<AoiId> {
        self.state.lock().unwrap().deletes.clone()
    }

    fn check(&self) -> Result<(), NetworkError> {
        match &self.state.lock().unwrap().fail {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AoiApi for FakeApi {
    async fn list(&self) -> Result<Vec<WireAoi>, NetworkError> {
        self.check()?;
        Ok(self.state.lock().unwrap().rows.clone())
    }

    async fn get(&self, id: &AoiId) -> Result<WireAoi, NetworkError> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|row| &row.id == id)
            .cloned()
            .ok_or_else(|| NetworkError::Status { status: 404, message: "AOI not found".into() })
    }

    async fn create(&self, request: &CreateRequest) -> Result<WireAoi, NetworkError> {
        self.check()?;
        let id = {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            state.creates.push(request.clone());
            let id = AoiId::Int(state.next_id);
            state.rows.push(WireAoi {
                id: id.clone(),
                name: Some(request.name.clone()),
                description: Some(request.description.clone()),
                geometry: Some(serde_json::Value::String(request.geometry.clone())),
                area: None,
                center: None,
                created_at: None,
                updated_at: None,
            });
            id
        };
        let held = self.held.lock().unwrap().contains(&request.name);
        if held {
            self.gate.notified().await;
        }
        Ok(WireAoi {
            id,
            name: None,
            description: None,
            geometry: None,
            area: None,
            center: None,
            created_at: None,
            updated_at: None,
        })
    }

    async fn delete(&self, id: &AoiId) -> Result<(), NetworkError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.deletes.push(id.clone());
        let before = state.rows.len();
        state.rows.retain(|row| &row.id != id);
        if state.rows.len() == before {
            return Err(NetworkError::Status { status: 404, message: "AOI not found".into() });
        }
        Ok(())
    }

    async fn health(&self) -> Result<String, NetworkError> {
        self.check()?;
        Ok("healthy".into())
    }
}
