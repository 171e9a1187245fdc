//! Map layer synchronizer: records in, layers out.
//!
//! DESIGN
//! ======
//! The synchronizer owns exactly one layer group on the map for its whole
//! lifetime (created in `new`, removed on drop). Rendering always rebuilds the
//! group from scratch: clear every child, then add one layer per record, tagged
//! with the record identity and wired to frame the record's bounds on click.
//! After a render the layer set is in 1:1 correspondence with the records, so
//! no layer from a previous render can survive.
//!
//! Renders are driven by the record store's change signal. `sync` is the
//! polling form for hosts that drive their own loop; `run` is the effect loop
//! for hosts with an async event loop.

#[cfg(test)]
#[path = "layers_test.rs"]
mod layers_test;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::doc::{AoiId, AoiList, AoiRecord};
use crate::map::{ClickBehavior, GroupId, LayerId, LayerSpec, MapHandle, MapSurface};
use crate::store::RecordStore;
use crate::viewport::Bounds;

/// Keeps one map layer group in step with the record store.
pub struct LayerSync<M: MapSurface> {
    map: MapHandle<M>,
    group: GroupId,
    records: watch::Receiver<AoiList>,
    rendered: Vec<(LayerId, AoiId)>,
    primed: bool,
}

impl<M: MapSurface> LayerSync<M> {
    /// Acquire a layer group on `map` and subscribe to `store`.
    #[must_use]
    pub fn new(map: MapHandle<M>, store: &RecordStore) -> Self {
        let group = map.borrow_mut().create_group();
        debug!(%group, "layer group acquired");
        Self { map, group, records: store.subscribe(), rendered: Vec::new(), primed: false }
    }

    /// Rebuild the group's layers from `records`.
    pub fn render(&mut self, records: &[AoiRecord]) {
        let mut map = self.map.borrow_mut();
        map.clear_group(self.group);
        self.rendered.clear();
        for record in records {
            let layer = map.add_layer(self.group, layer_spec(record));
            self.rendered.push((layer, record.id.clone()));
        }
        debug!(group = %self.group, count = self.rendered.len(), "layers rebuilt");
    }

    /// Render if the store changed since the last render (or nothing has been
    /// rendered yet). Returns `true` when a render happened.
    pub fn sync(&mut self) -> bool {
        let changed = match self.records.has_changed() {
            Ok(changed) => changed,
            Err(_) => {
                debug!("record store closed; nothing to sync");
                return false;
            }
        };
        if !changed && self.primed {
            return false;
        }
        let snapshot = self.records.borrow_and_update().clone();
        self.render(snapshot.as_slice());
        self.primed = true;
        true
    }

    /// Render now, then again after every store change, until the store is dropped.
    pub async fn run(&mut self) {
        self.sync();
        while self.records.changed().await.is_ok() {
            let snapshot = self.records.borrow_and_update().clone();
            self.render(snapshot.as_slice());
            self.primed = true;
        }
        debug!(group = %self.group, "layer sync loop finished");
    }

    /// The owned layer group.
    #[must_use]
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Number of layers produced by the last render.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.rendered.len()
    }

    /// Layers produced by the last render, in record order.
    #[must_use]
    pub fn layers(&self) -> &[(LayerId, AoiId)] {
        &self.rendered
    }

    /// Map a layer (e.g. a clicked one) back to its record identity.
    #[must_use]
    pub fn record_for_layer(&self, layer: LayerId) -> Option<&AoiId> {
        self.rendered.iter().find(|(id, _)| *id == layer).map(|(_, tag)| tag)
    }

    /// The layer currently rendering a record.
    #[must_use]
    pub fn layer_for_record(&self, record: &AoiId) -> Option<LayerId> {
        self.rendered.iter().find(|(_, tag)| tag == record).map(|(id, _)| *id)
    }
}

impl<M: MapSurface> Drop for LayerSync<M> {
    fn drop(&mut self) {
        match self.map.try_borrow_mut() {
            Ok(mut map) => {
                map.remove_group(self.group);
                debug!(group = %self.group, "layer group released");
            }
            Err(e) => warn!(group = %self.group, error = %e, "map busy; layer group not released"),
        }
    }
}

fn layer_spec(record: &AoiRecord) -> LayerSpec {
    let on_click = match Bounds::of(&record.geometry).and_then(Bounds::validated) {
        Ok(bounds) => ClickBehavior::FrameBounds(bounds),
        Err(e) => {
            warn!(id = %record.id, error = %e, "layer has no frameable bounds");
            ClickBehavior::Ignore
        }
    };
    LayerSpec { tag: record.id.clone(), label: record.name.clone(), feature: record.geometry.clone(), on_click }
}
