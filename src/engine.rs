//! Composition root: one map, one record store, one drawing session.
//!
//! `AoiEngine` wires the drawing controller, the layer synchronizer, and the
//! persistence gateway to a single injected map handle. Synchronous calls
//! (`begin_drawing`, `poll_drawing`, `commit`, `view`) return immediately;
//! the async ones (`save`, `delete`, `refresh`) await the backend and then
//! bring the map layers up to date with the store.
//!
//! Hosts that keep several creates in flight at once call `commit` and hand
//! the returned `NewAoi` to a clone of [`AoiEngine::gateway`]; the layer
//! synchronizer picks the results up on the next `sync_layers` (or in its
//! `run` loop).

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::AoiApi;
use crate::doc::{AoiId, AoiList, AoiRecord, NewAoi};
use crate::draw::{DrawEvent, DrawSession, DrawState};
use crate::error::{AoiError, ErrorCode};
use crate::gateway::PersistenceGateway;
use crate::layers::LayerSync;
use crate::map::{DrawTool, LayerId, MapHandle, MapSurface};
use crate::notify::Notifier;
use crate::store::RecordStore;
use crate::viewport::Bounds;

pub struct AoiEngine<M: MapSurface> {
    map: MapHandle<M>,
    draw: DrawSession<M>,
    layers: LayerSync<M>,
    gateway: PersistenceGateway,
    notifier: Arc<dyn Notifier>,
}

impl<M: MapSurface> AoiEngine<M> {
    /// Build the engine on `map` with an empty store and an attached draw listener.
    #[must_use]
    pub fn new(map: MapHandle<M>, api: Arc<dyn AoiApi>, notifier: Arc<dyn Notifier>) -> Self {
        let store = RecordStore::new();
        let layers = LayerSync::new(map.clone(), &store);
        let mut draw = DrawSession::new(map.clone());
        draw.attach();
        let gateway = PersistenceGateway::new(api, store, Arc::clone(&notifier));
        Self { map, draw, layers, gateway, notifier }
    }

    // --- Drawing ---

    /// Activate a draw tool.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::InvalidState`] while a draft awaits a name.
    pub fn begin_drawing(&mut self, tool: DrawTool) -> Result<(), AoiError> {
        self.draw.begin(tool).inspect_err(|e| self.reject(e))
    }

    /// Process completed gestures delivered by the map.
    pub fn poll_drawing(&mut self) -> Vec<DrawEvent> {
        let events = self.draw.poll();
        for event in &events {
            if let DrawEvent::GestureAborted { error } = event {
                self.notifier.error(&format!("shape rejected: {error}"));
            }
        }
        events
    }

    /// Name the pending draft and take it out of the slot.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::Validation`] for a blank name (the draft is kept)
    /// or [`AoiError::InvalidState`] without a draft.
    pub fn commit(&mut self, name: &str, description: &str) -> Result<NewAoi, AoiError> {
        self.draw.commit(name, description).inspect_err(|e| self.reject(e))
    }

    /// Abandon the sketch or discard the pending draft.
    pub fn cancel_drawing(&mut self) -> bool {
        self.draw.cancel()
    }

    // --- Persistence ---

    /// Commit the pending draft and persist it.
    ///
    /// # Errors
    ///
    /// Returns the commit error, or the gateway error if the create fails.
    pub async fn save(&mut self, name: &str, description: &str) -> Result<AoiRecord, AoiError> {
        let new_aoi = self.commit(name, description)?;
        let result = self.gateway.create(new_aoi).await;
        self.sync_layers();
        result
    }

    /// Delete a record by identity.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::NotFound`] if the record is not in the store, or
    /// the gateway error if the delete fails.
    pub async fn delete(&mut self, id: &AoiId) -> Result<(), AoiError> {
        if !self.gateway.store().contains(id) {
            let err = AoiError::NotFound(id.clone());
            self.reject(&err);
            return Err(err);
        }
        let result = self.gateway.remove(id).await;
        self.sync_layers();
        result
    }

    /// Reload every record from the backend and rebuild the layers.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; store and layers are unchanged in that case.
    pub async fn refresh(&mut self) -> Result<Vec<AoiRecord>, AoiError> {
        let result = self.gateway.refresh().await;
        self.sync_layers();
        result
    }

    // --- Viewport ---

    /// Frame the map on a record's bounds.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::NotFound`] for an unknown identity, or a geometry
    /// error for degenerate bounds (the viewport is left as is).
    pub fn view(&mut self, id: &AoiId) -> Result<Bounds, AoiError> {
        let Some(record) = self.gateway.store().get(id) else {
            let err = AoiError::NotFound(id.clone());
            self.reject(&err);
            return Err(err);
        };
        match Bounds::of(&record.geometry).and_then(Bounds::validated) {
            Ok(bounds) => {
                self.map.borrow_mut().fit_bounds(bounds);
                debug!(%id, ?bounds, "viewport framed");
                Ok(bounds)
            }
            Err(e) => {
                let err = AoiError::from(e);
                self.reject(&err);
                Err(err)
            }
        }
    }

    /// Frame the map on the record a clicked layer renders.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::InvalidState`] for a layer this engine did not
    /// render, otherwise as [`AoiEngine::view`].
    pub fn layer_clicked(&mut self, layer: LayerId) -> Result<Bounds, AoiError> {
        let Some(id) = self.layers.record_for_layer(layer).cloned() else {
            return Err(AoiError::InvalidState("layer is not an AOI layer"));
        };
        self.view(&id)
    }

    // --- Layers and state ---

    /// Re-render layers if the store changed. Returns `true` when a render happened.
    pub fn sync_layers(&mut self) -> bool {
        self.layers.sync()
    }

    /// Snapshot of the confirmed records.
    #[must_use]
    pub fn records(&self) -> AoiList {
        self.gateway.store().snapshot()
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        self.gateway.store()
    }

    #[must_use]
    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    #[must_use]
    pub fn draw_state(&self) -> &DrawState {
        self.draw.state()
    }

    #[must_use]
    pub fn layers(&self) -> &LayerSync<M> {
        &self.layers
    }

    #[must_use]
    pub fn map(&self) -> &MapHandle<M> {
        &self.map
    }

    fn reject(&self, error: &AoiError) {
        warn!(code = error.error_code(), error = %error, "request rejected");
        self.notifier.error(&error.to_string());
    }
}
