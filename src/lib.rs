//! AOI reconciliation engine for the geoscan map workbench.
//!
//! A user draws polygons and rectangles on a map, names them as Areas of
//! Interest, and persists them to a REST backend. This crate keeps three
//! representations in step: the live drawing interaction on the map's layer
//! tree, the ordered list of AOI records held in memory, and the remote store.
//! Metrics (area, centroid) are derived once when a shape is drawn, and the map
//! layers are rebuilt from the record list every time it changes.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`metrics`] | Geodesic area and centroid of a drawn shape |
//! | [`doc`] | AOI record types and the ordered record collection |
//! | [`store`] | Observable record store handle (change signal) |
//! | [`map`] | Map surface boundary and the in-memory [`map::HeadlessMap`] |
//! | [`viewport`] | Bounds and fit-to-bounds viewport math |
//! | [`layers`] | One-way synchronizer from records to map layers |
//! | [`draw`] | Drawing session state machine and pending draft slot |
//! | [`api`] | REST wire types and the `reqwest` backend client |
//! | [`gateway`] | Create/remove/refresh intents folded into the store |
//! | [`notify`] | User-facing notification boundary |
//! | [`engine`] | Composition root wiring the pieces to one map |
//! | [`config`] | Environment-driven client configuration |
//! | [`error`] | Error taxonomy |
//! | [`consts`] | Shared numeric constants |

pub mod api;
pub mod config;
pub mod consts;
pub mod doc;
pub mod draw;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod layers;
pub mod map;
pub mod metrics;
pub mod notify;
pub mod store;
pub mod viewport;

#[cfg(test)]
mod test_helpers;
