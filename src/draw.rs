//! Drawing session: the gesture state machine and the pending-draft slot.
//!
//! The controller moves through `Idle → Drawing → PendingNaming → Idle`. A
//! completed gesture becomes the single pending draft (metrics already
//! computed); committing it with a name hands a [`NewAoi`] to the caller for
//! persistence and empties the slot, cancelling discards it.
//!
//! The "draw completed" listener is held by a [`DrawBinding`] guard: binding
//! and unbinding happen in one scoped lifecycle, so re-attaching can never
//! leave two listeners producing two drafts for one gesture.

#[cfg(test)]
#[path = "draw_test.rs"]
mod draw_test;

use geojson::Feature;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::doc::{NewAoi, PendingDraft};
use crate::error::{AoiError, GeometryError};
use crate::map::{DrawSink, DrawTool, DrawnShape, ListenerId, MapHandle, MapSurface};
use crate::metrics::{self, Metrics};

/// Gesture state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DrawState {
    /// No sketch in progress.
    #[default]
    Idle,
    /// A draw tool is active and the user is sketching.
    Drawing { tool: DrawTool },
    /// A shape was completed and awaits a name.
    PendingNaming { draft: PendingDraft },
}

/// Outcome of a processed draw gesture, for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    /// A draft is ready: collect a name and description.
    NamingRequested { metrics: Metrics },
    /// The shape was malformed; the gesture was abandoned.
    GestureAborted { error: GeometryError },
}

/// Scoped registration of a draw listener; unsubscribes on drop.
pub struct DrawBinding<M: MapSurface> {
    map: MapHandle<M>,
    listener: ListenerId,
}

impl<M: MapSurface> DrawBinding<M> {
    fn bind(map: &MapHandle<M>, sink: DrawSink) -> Self {
        let listener = map.borrow_mut().subscribe_draw_created(sink);
        debug!(%listener, "draw listener bound");
        Self { map: map.clone(), listener }
    }

    #[must_use]
    pub fn listener(&self) -> ListenerId {
        self.listener
    }
}

impl<M: MapSurface> Drop for DrawBinding<M> {
    fn drop(&mut self) {
        match self.map.try_borrow_mut() {
            Ok(mut map) => {
                map.unsubscribe(self.listener);
                debug!(listener = %self.listener, "draw listener unbound");
            }
            Err(e) => warn!(listener = %self.listener, error = %e, "map busy; draw listener not unbound"),
        }
    }
}

/// Drawing session controller for one map.
pub struct DrawSession<M: MapSurface> {
    map: MapHandle<M>,
    state: DrawState,
    binding: Option<DrawBinding<M>>,
    sink: DrawSink,
    shapes: mpsc::UnboundedReceiver<DrawnShape>,
}

impl<M: MapSurface> DrawSession<M> {
    /// Create a detached controller. Call [`DrawSession::attach`] to start
    /// receiving gestures.
    #[must_use]
    pub fn new(map: MapHandle<M>) -> Self {
        let (sink, shapes) = mpsc::unbounded_channel();
        Self { map, state: DrawState::Idle, binding: None, sink, shapes }
    }

    /// Bind the draw listener. Re-attaching releases the previous binding first.
    pub fn attach(&mut self) {
        self.detach();
        self.binding = Some(DrawBinding::bind(&self.map, self.sink.clone()));
    }

    /// Release the draw listener, if bound.
    pub fn detach(&mut self) {
        self.binding = None;
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.binding.is_some()
    }

    /// Identity of the bound draw listener, if attached.
    #[must_use]
    pub fn listener(&self) -> Option<ListenerId> {
        self.binding.as_ref().map(DrawBinding::listener)
    }

    #[must_use]
    pub fn state(&self) -> &DrawState {
        &self.state
    }

    /// The pending draft, if a shape awaits a name.
    #[must_use]
    pub fn draft(&self) -> Option<&PendingDraft> {
        match &self.state {
            DrawState::PendingNaming { draft } => Some(draft),
            DrawState::Idle | DrawState::Drawing { .. } => None,
        }
    }

    /// Activate a draw tool (`Idle → Drawing`, or switch tool while drawing).
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::InvalidState`] while a draft awaits a name.
    pub fn begin(&mut self, tool: DrawTool) -> Result<(), AoiError> {
        if matches!(self.state, DrawState::PendingNaming { .. }) {
            return Err(AoiError::InvalidState("a drawn shape is awaiting a name"));
        }
        self.map.borrow_mut().set_draw_tool(Some(tool));
        self.state = DrawState::Drawing { tool };
        debug!(?tool, "drawing started");
        Ok(())
    }

    /// Process every shape the map delivered since the last poll.
    pub fn poll(&mut self) -> Vec<DrawEvent> {
        let mut events = Vec::new();
        while let Ok(shape) = self.shapes.try_recv() {
            match self.complete(shape) {
                Ok(metrics) => events.push(DrawEvent::NamingRequested { metrics }),
                Err(AoiError::Geometry(error)) => events.push(DrawEvent::GestureAborted { error }),
                Err(e) => warn!(error = %e, "draw event ignored"),
            }
        }
        events
    }

    /// Turn a completed gesture into the pending draft (`Drawing → PendingNaming`).
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::InvalidState`] if no sketch is in progress, or
    /// [`AoiError::Geometry`] if the shape is malformed (the gesture is then
    /// abandoned and the controller returns to `Idle`).
    pub fn complete(&mut self, shape: DrawnShape) -> Result<Metrics, AoiError> {
        if !matches!(self.state, DrawState::Drawing { .. }) {
            return Err(AoiError::InvalidState("no sketch in progress"));
        }
        self.map.borrow_mut().set_draw_tool(None);

        let geometry = normalize(&shape.feature);
        match metrics::compute(&geometry) {
            Ok(metrics) => {
                info!(area = metrics.area, center = ?metrics.center, tool = ?shape.tool, "shape drawn");
                self.state = DrawState::PendingNaming { draft: PendingDraft { tool: shape.tool, geometry, metrics } };
                Ok(metrics)
            }
            Err(e) => {
                warn!(error = %e, "drawn shape rejected");
                self.state = DrawState::Idle;
                Err(e.into())
            }
        }
    }

    /// Name the pending draft and take it out of the slot (`PendingNaming → Idle`).
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::Validation`] for a blank name (the draft is kept),
    /// or [`AoiError::InvalidState`] if no draft is pending.
    pub fn commit(&mut self, name: &str, description: &str) -> Result<NewAoi, AoiError> {
        if !matches!(self.state, DrawState::PendingNaming { .. }) {
            return Err(AoiError::InvalidState("no drawn shape awaiting a name"));
        }
        if name.trim().is_empty() {
            return Err(AoiError::Validation("AOI name must not be empty".into()));
        }
        match std::mem::take(&mut self.state) {
            DrawState::PendingNaming { draft } => Ok(draft.named(name, description)),
            other => {
                self.state = other;
                Err(AoiError::InvalidState("no drawn shape awaiting a name"))
            }
        }
    }

    /// Abandon the sketch or discard the pending draft. Returns `true` if a
    /// draft was discarded.
    pub fn cancel(&mut self) -> bool {
        let discarded = matches!(self.state, DrawState::PendingNaming { .. });
        if matches!(self.state, DrawState::Drawing { .. }) {
            self.map.borrow_mut().set_draw_tool(None);
        }
        self.state = DrawState::Idle;
        if discarded {
            debug!("pending draft discarded");
        }
        discarded
    }
}

/// Keep only the geometry of a drawn feature; tool-specific properties are dropped.
fn normalize(feature: &Feature) -> Feature {
    Feature { bbox: None, geometry: feature.geometry.clone(), id: None, properties: None, foreign_members: None }
}
