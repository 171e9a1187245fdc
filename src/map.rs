//! Map surface boundary and an in-memory implementation.
//!
//! SYSTEM CONTEXT
//! ==============
//! The interactive map (tiles, drawing widgets, hit-testing) is an external
//! collaborator. The engine needs exactly three capabilities from it: layer
//! groups for application shapes, a drawing tool that emits "shape completed"
//! events, and per-layer click and fit-to-bounds behavior. [`MapSurface`]
//! names those capabilities; [`HeadlessMap`] implements them in memory for
//! the CLI host and for tests.
//!
//! DESIGN
//! ======
//! There is no global map. The host creates one [`MapHandle`] and injects
//! clones of it into the components that need it. Draw events are delivered
//! through channels rather than callbacks, so a component can never observe a
//! stale closure and the map never re-enters the engine.

#[cfg(test)]
#[path = "map_test.rs"]
mod map_test;

use std::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use geojson::Feature;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::consts::FIT_PADDING_PX;
use crate::doc::AoiId;
use crate::viewport::{Bounds, Viewport};

/// Identifier of a layer group on the map.
pub type GroupId = Uuid;

/// Identifier of a single layer on the map.
pub type LayerId = Uuid;

/// Identifier of a registered draw listener.
pub type ListenerId = Uuid;

/// Which drawing tool produced a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTool {
    /// Free polygon, self-intersection prevented by the tool.
    Polygon,
    /// Axis-aligned rectangle.
    Rectangle,
}

/// Raw shape emitted by the map's drawing tool when a gesture completes.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnShape {
    pub tool: DrawTool,
    /// The shape as GeoJSON, including whatever properties the tool attached.
    pub feature: Feature,
}

/// Channel end the map pushes completed shapes into.
pub type DrawSink = mpsc::UnboundedSender<DrawnShape>;

/// What a layer does when the user clicks it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickBehavior {
    /// Re-frame the viewport to these bounds.
    FrameBounds(Bounds),
    /// Nothing to frame (degenerate geometry).
    Ignore,
}

/// Everything the map needs to draw one AOI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Identity of the record this layer renders.
    pub tag: AoiId,
    /// Label bound to the layer (the AOI name).
    pub label: String,
    pub feature: Feature,
    pub on_click: ClickBehavior,
}

/// Capabilities the engine requires from an interactive map.
pub trait MapSurface {
    /// Create an empty, persistent layer group.
    fn create_group(&mut self) -> GroupId;

    /// Remove a group and every layer in it.
    fn remove_group(&mut self, group: GroupId);

    /// Remove every layer in a group, keeping the group.
    fn clear_group(&mut self, group: GroupId);

    /// Add a layer to a group.
    fn add_layer(&mut self, group: GroupId, layer: LayerSpec) -> LayerId;

    /// Record identity the layer was tagged with.
    fn layer_tag(&self, layer: LayerId) -> Option<AoiId>;

    /// Activate a drawing tool, or deactivate drawing with `None`.
    fn set_draw_tool(&mut self, tool: Option<DrawTool>);

    /// Register a listener for completed draw gestures.
    fn subscribe_draw_created(&mut self, sink: DrawSink) -> ListenerId;

    /// Deregister a draw listener.
    fn unsubscribe(&mut self, listener: ListenerId);

    /// Re-frame the viewport on a box.
    fn fit_bounds(&mut self, bounds: Bounds);
}

/// Shared, single-threaded handle to the one map of a session.
pub struct MapHandle<M> {
    inner: Rc<RefCell<M>>,
}

impl<M> MapHandle<M> {
    #[must_use]
    pub fn new(map: M) -> Self {
        Self { inner: Rc::new(RefCell::new(map)) }
    }

    /// Immutable access to the map.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, M> {
        self.inner.borrow()
    }

    /// Mutable access to the map.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, M> {
        self.inner.borrow_mut()
    }

    /// Immutable access that fails instead of panicking if the map is mutably borrowed.
    ///
    /// # Errors
    ///
    /// Returns [`BorrowError`] while another mutable borrow is live.
    pub fn try_borrow(&self) -> Result<Ref<'_, M>, BorrowError> {
        self.inner.try_borrow()
    }

    /// Mutable access that fails instead of panicking if the map is already borrowed.
    ///
    /// # Errors
    ///
    /// Returns [`BorrowMutError`] while another borrow is live.
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, M>, BorrowMutError> {
        self.inner.try_borrow_mut()
    }
}

impl<M> Clone for MapHandle<M> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

// =============================================================================
// HEADLESS MAP
// =============================================================================

/// In-memory map surface: a layer tree, a viewport, and draw listeners.
#[derive(Debug)]
pub struct HeadlessMap {
    groups: HashMap<GroupId, Vec<LayerId>>,
    layers: HashMap<LayerId, LayerSpec>,
    listeners: Vec<(ListenerId, DrawSink)>,
    active_tool: Option<DrawTool>,
    viewport: Viewport,
    width_px: f64,
    height_px: f64,
}

impl HeadlessMap {
    /// Create a map with a screen of `width_px` x `height_px` CSS pixels.
    #[must_use]
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self {
            groups: HashMap::new(),
            layers: HashMap::new(),
            listeners: Vec::new(),
            active_tool: None,
            viewport: Viewport::default(),
            width_px,
            height_px,
        }
    }

    /// Deliver a completed gesture to every registered listener. Returns the
    /// number of listeners that received it; closed listeners are dropped.
    pub fn emit_draw_created(&mut self, shape: &DrawnShape) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|(_, sink)| sink.send(shape.clone()).is_ok());
        if self.listeners.len() < before {
            debug!(dropped = before - self.listeners.len(), "pruned closed draw listeners");
        }
        self.listeners.len()
    }

    /// Simulate a click on a layer: runs its click behavior and returns the
    /// record identity it is tagged with.
    pub fn click(&mut self, layer: LayerId) -> Option<AoiId> {
        let spec = self.layers.get(&layer)?;
        let tag = spec.tag.clone();
        let on_click = spec.on_click;
        if let ClickBehavior::FrameBounds(bounds) = on_click {
            self.fit_bounds(bounds);
        }
        Some(tag)
    }

    /// Layers of a group in insertion order.
    #[must_use]
    pub fn group_layers(&self, group: GroupId) -> Vec<(LayerId, &LayerSpec)> {
        self.groups
            .get(&group)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.layers.get(id).map(|spec| (*id, spec)))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn layer(&self, layer: LayerId) -> Option<&LayerSpec> {
        self.layers.get(&layer)
    }

    /// Total number of layers across all groups.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn active_tool(&self) -> Option<DrawTool> {
        self.active_tool
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

impl MapSurface for HeadlessMap {
    fn create_group(&mut self) -> GroupId {
        let id = Uuid::new_v4();
        self.groups.insert(id, Vec::new());
        id
    }

    fn remove_group(&mut self, group: GroupId) {
        self.clear_group(group);
        self.groups.remove(&group);
    }

    fn clear_group(&mut self, group: GroupId) {
        if let Some(ids) = self.groups.get_mut(&group) {
            for id in ids.drain(..) {
                self.layers.remove(&id);
            }
        }
    }

    fn add_layer(&mut self, group: GroupId, layer: LayerSpec) -> LayerId {
        let id = Uuid::new_v4();
        match self.groups.get_mut(&group) {
            Some(ids) => {
                ids.push(id);
                self.layers.insert(id, layer);
            }
            None => warn!(%group, "add_layer on unknown group; layer dropped"),
        }
        id
    }

    fn layer_tag(&self, layer: LayerId) -> Option<AoiId> {
        self.layers.get(&layer).map(|spec| spec.tag.clone())
    }

    fn set_draw_tool(&mut self, tool: Option<DrawTool>) {
        self.active_tool = tool;
    }

    fn subscribe_draw_created(&mut self, sink: DrawSink) -> ListenerId {
        let id = Uuid::new_v4();
        self.listeners.push((id, sink));
        id
    }

    fn unsubscribe(&mut self, listener: ListenerId) {
        self.listeners.retain(|(id, _)| *id != listener);
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        match Viewport::fit(bounds, self.width_px, self.height_px, FIT_PADDING_PX) {
            Ok(viewport) => self.viewport = viewport,
            Err(e) => warn!(error = %e, ?bounds, "fit_bounds skipped"),
        }
    }
}
