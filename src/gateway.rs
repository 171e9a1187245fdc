//! Persistence gateway: create/remove/refresh intents folded into the store.
//!
//! DESIGN
//! ======
//! Each operation is one round-trip to the backend followed by at most one
//! store mutation. The store is touched only after the response is fully
//! decoded, so a failed call (or a refresh with one undecodable record)
//! leaves it exactly as it was. Outcomes are reported to the notifier here,
//! once, so callers only need the returned `Result` for control flow.
//!
//! Responses apply in the order they arrive. Two creates in flight append in
//! completion order, each with its own server identity.

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;

use std::sync::Arc;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::api::{AoiApi, CreateRequest, WireAoi, decode_geometry, encode_geometry};
use crate::doc::{AoiId, AoiRecord, NewAoi};
use crate::error::{AoiError, ErrorCode, GeometryError};
use crate::metrics;
use crate::notify::Notifier;
use crate::store::RecordStore;

pub const SAVED_NOTICE: &str = "AOI saved successfully";
pub const DELETED_NOTICE: &str = "AOI deleted successfully";

/// Async boundary between the engine and the remote AOI store.
#[derive(Clone)]
pub struct PersistenceGateway {
    api: Arc<dyn AoiApi>,
    store: RecordStore,
    notifier: Arc<dyn Notifier>,
}

impl PersistenceGateway {
    #[must_use]
    pub fn new(api: Arc<dyn AoiApi>, store: RecordStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, store, notifier }
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Persist a named draft and append the confirmed record.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::Validation`] for a blank name, [`AoiError::Geometry`]
    /// if the geometry cannot be encoded, or [`AoiError::Network`] if the
    /// backend call fails. The store is unchanged on error.
    pub async fn create(&self, new_aoi: NewAoi) -> Result<AoiRecord, AoiError> {
        let result = self.try_create(new_aoi).await;
        match &result {
            Ok(record) => {
                info!(id = %record.id, name = %record.name, area = record.area, "AOI created");
                self.notifier.success(SAVED_NOTICE);
            }
            Err(e) => self.report("create", e),
        }
        result
    }

    async fn try_create(&self, new_aoi: NewAoi) -> Result<AoiRecord, AoiError> {
        if new_aoi.name.trim().is_empty() {
            return Err(AoiError::Validation("AOI name must not be empty".into()));
        }
        let request = CreateRequest {
            name: new_aoi.name.clone(),
            description: new_aoi.description.clone(),
            geometry: encode_geometry(&new_aoi.geometry)?,
        };
        let response = self.api.create(&request).await?;
        let record = confirmed_record(response, new_aoi);
        self.store.append(record.clone());
        Ok(record)
    }

    /// Delete an AOI remotely, then drop it from the store.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::Network`] if the backend call fails; the record
    /// stays in the store.
    pub async fn remove(&self, id: &AoiId) -> Result<(), AoiError> {
        match self.api.delete(id).await {
            Ok(()) => {
                if self.store.remove(id).is_none() {
                    warn!(%id, "deleted AOI was not in the store");
                }
                info!(%id, "AOI deleted");
                self.notifier.success(DELETED_NOTICE);
                Ok(())
            }
            Err(e) => {
                let err = AoiError::from(e);
                self.report("delete", &err);
                Err(err)
            }
        }
    }

    /// Fetch every AOI and replace the store contents with them.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::Network`] if the backend call fails, or
    /// [`AoiError::Geometry`] if any record's geometry cannot be decoded. The
    /// store is untouched in both cases.
    pub async fn refresh(&self) -> Result<Vec<AoiRecord>, AoiError> {
        let result = self.try_refresh().await;
        match &result {
            Ok(records) => info!(count = records.len(), "AOIs refreshed"),
            Err(e) => self.report("refresh", e),
        }
        result
    }

    async fn try_refresh(&self) -> Result<Vec<AoiRecord>, AoiError> {
        let wire = self.api.list().await?;
        let records = wire.into_iter().map(record_from_wire).collect::<Result<Vec<_>, _>>()?;
        self.store.replace_all(records);
        Ok(self.store.snapshot().as_slice().to_vec())
    }

    /// Read one AOI from the backend without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`AoiError::Network`] on a failed call (including an unknown
    /// identity) or [`AoiError::Geometry`] for an undecodable geometry.
    pub async fn fetch(&self, id: &AoiId) -> Result<AoiRecord, AoiError> {
        let result = match self.api.get(id).await {
            Ok(wire) => record_from_wire(wire).map_err(AoiError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            self.report("fetch", e);
        }
        result
    }

    fn report(&self, operation: &str, error: &AoiError) {
        warn!(operation, code = error.error_code(), error = %error, "AOI operation failed");
        self.notifier.error(&format!("{operation} failed: {error}"));
    }
}

/// Build the confirmed record from a create response. Anything the response
/// omits comes from the submitted draft; geometry and metrics always do.
fn confirmed_record(response: WireAoi, new_aoi: NewAoi) -> AoiRecord {
    let name = match response.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => new_aoi.name,
    };
    AoiRecord {
        id: response.id,
        name,
        description: response.description.unwrap_or(new_aoi.description),
        geometry: new_aoi.geometry,
        area: new_aoi.metrics.area,
        center: new_aoi.metrics.center,
        created_at: response.created_at.or_else(now_rfc3339),
        updated_at: response.updated_at,
    }
}

/// Decode a listed or fetched AOI. Metrics are recomputed from the geometry;
/// any server-side `area`/`center` is ignored.
///
/// # Errors
///
/// Returns [`GeometryError::MissingGeometry`] when the record has no geometry,
/// or the decode/metrics error for a malformed one.
pub fn record_from_wire(wire: WireAoi) -> Result<AoiRecord, GeometryError> {
    let raw = wire.geometry.ok_or(GeometryError::MissingGeometry)?;
    let geometry = decode_geometry(&raw)?;
    let metrics = metrics::compute(&geometry)?;
    let name = match wire.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => format!("AOI {}", wire.id),
    };
    Ok(AoiRecord {
        id: wire.id,
        name,
        description: wire.description.unwrap_or_default(),
        geometry,
        area: metrics.area,
        center: metrics.center,
        created_at: wire.created_at,
        updated_at: wire.updated_at,
    })
}

fn now_rfc3339() -> Option<String> {
    match OffsetDateTime::now_utc().format(&Rfc3339) {
        Ok(stamp) => Some(stamp),
        Err(e) => {
            warn!(error = %e, "timestamp format failed");
            None
        }
    }
}
