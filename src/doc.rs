//! Document model: AOI records, pending drafts, and the ordered collection.
//!
//! This module defines what an Area of Interest is once it has a server
//! identity (`AoiRecord`), what it is before that (`PendingDraft`, `NewAoi`),
//! and the ordered in-memory collection that holds the confirmed records
//! (`AoiList`). Data flows in from the network (gateway) and from the drawing
//! controller; the layer synchronizer reads the collection to rebuild the map.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::fmt;
use std::str::FromStr;

use geojson::{Feature, FeatureCollection, JsonObject};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::map::DrawTool;
use crate::metrics::Metrics;

/// Server-assigned identity of an AOI. Integer for the reference backend,
/// but any string identity is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AoiId {
    Int(i64),
    Text(String),
}

impl fmt::Display for AoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for AoiId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for AoiId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl AoiId {
    /// Parse user-typed text. Only canonical integers (`42`, `-3`) become
    /// [`AoiId::Int`]; `007` or `+5` stay text so they match a string
    /// identity the backend sent.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match text.parse::<i64>() {
            Ok(id) if id.to_string() == text => Self::Int(id),
            _ => Self::Text(text.to_owned()),
        }
    }
}

impl FromStr for AoiId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_text(s))
    }
}

/// A persisted Area of Interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AoiRecord {
    /// Server-assigned identity, unique among records.
    pub id: AoiId,
    /// Display label, never empty.
    pub name: String,
    /// Free text; empty when the user gave none.
    pub description: String,
    /// Polygonal feature as drawn. Immutable once created.
    pub geometry: Feature,
    /// Area in km², rounded to 2 decimals. Derived from `geometry`.
    pub area: f64,
    /// Centroid as `[longitude, latitude]`, rounded to 6 decimals. Derived from `geometry`.
    pub center: [f64; 2],
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl AoiRecord {
    /// Derived metrics as stored on the record.
    #[must_use]
    pub fn metrics(&self) -> Metrics {
        Metrics { area: self.area, center: self.center }
    }

    /// Export the record as a GeoJSON feature with its attributes as properties.
    #[must_use]
    pub fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("id".into(), serde_json::json!(self.id));
        properties.insert("name".into(), self.name.clone().into());
        properties.insert("description".into(), self.description.clone().into());
        properties.insert("area".into(), self.area.into());
        properties.insert("center".into(), serde_json::json!(self.center));
        if let Some(created_at) = &self.created_at {
            properties.insert("createdAt".into(), created_at.clone().into());
        }
        if let Some(updated_at) = &self.updated_at {
            properties.insert("updatedAt".into(), updated_at.clone().into());
        }
        Feature {
            bbox: None,
            geometry: self.geometry.geometry.clone(),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// A just-drawn shape with its metrics, awaiting a name.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDraft {
    /// Tool the shape was drawn with.
    pub tool: DrawTool,
    /// Normalized feature (geometry only, no properties).
    pub geometry: Feature,
    pub metrics: Metrics,
}

impl PendingDraft {
    /// Attach the user's name and description, producing a create intent.
    #[must_use]
    pub fn named(self, name: &str, description: &str) -> NewAoi {
        NewAoi {
            name: name.trim().to_owned(),
            description: description.trim().to_owned(),
            geometry: self.geometry,
            metrics: self.metrics,
        }
    }
}

/// A named draft handed to the persistence gateway for creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAoi {
    pub name: String,
    pub description: String,
    pub geometry: Feature,
    pub metrics: Metrics,
}

/// Ordered collection of confirmed AOI records, unique by identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AoiList {
    records: Vec<AoiRecord>,
}

impl AoiList {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Append a record. A record whose identity is already present replaces
    /// the existing entry in place; returns `true` in that case.
    pub fn upsert(&mut self, record: AoiRecord) -> bool {
        if let Some(existing) = self.records.iter_mut().find(|r| r.id == record.id) {
            warn!(id = %record.id, "replacing AOI with duplicate identity");
            *existing = record;
            return true;
        }
        self.records.push(record);
        false
    }

    /// Remove the record with this identity, returning it if it was present.
    pub fn remove(&mut self, id: &AoiId) -> Option<AoiRecord> {
        let index = self.records.iter().position(|r| &r.id == id)?;
        Some(self.records.remove(index))
    }

    /// Replace the whole collection. Later duplicates win, keeping the
    /// position of the first occurrence.
    pub fn replace_all(&mut self, records: Vec<AoiRecord>) {
        self.records.clear();
        for record in records {
            self.upsert(record);
        }
    }

    /// Look up a record by identity.
    #[must_use]
    pub fn get(&self, id: &AoiId) -> Option<&AoiRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &AoiId) -> bool {
        self.get(id).is_some()
    }

    /// Identity of the record whose displayed id equals `text`, so `42`
    /// finds a record keyed `Text("42")` as well as `Int(42)`. Falls back to
    /// [`AoiId::from_text`] when nothing matches.
    #[must_use]
    pub fn resolve(&self, text: &str) -> AoiId {
        self.records
            .iter()
            .find(|r| r.id.to_string() == text)
            .map_or_else(|| AoiId::from_text(text), |r| r.id.clone())
    }

    /// Records in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[AoiRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &AoiRecord> {
        self.records.iter()
    }

    /// Identities in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<AoiId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Export every record as one GeoJSON feature collection.
    #[must_use]
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.records.iter().map(AoiRecord::to_feature).collect(),
            foreign_members: None,
        }
    }
}

impl From<Vec<AoiRecord>> for AoiList {
    fn from(records: Vec<AoiRecord>) -> Self {
        let mut list = Self::new();
        list.replace_all(records);
        list
    }
}
