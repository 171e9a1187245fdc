//! AOI backend REST client.
//!
//! Thin HTTP wrapper for the `/api/aois` surface. The wire format stores
//! geometry as a GeoJSON *string*; encoding and decoding live in pure helpers
//! (`encode_geometry`, `decode_geometry`, `failure_message`) so they can be
//! tested without a server. The gateway talks to the backend only through the
//! [`AoiApi`] trait.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use async_trait::async_trait;
use geojson::{Feature, GeoJson, Geometry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ApiConfig;
use crate::doc::AoiId;
use crate::error::{GeometryError, NetworkError};

// =============================================================================
// WIRE TYPES
// =============================================================================

/// An AOI as the backend reports it. Only `id` is guaranteed; the create
/// response carries little more than that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAoi {
    pub id: AoiId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// GeoJSON as a string (reference backend) or as an inline object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of `POST /api/aois`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    pub description: String,
    /// String-encoded GeoJSON geometry.
    pub geometry: String,
}

/// Body of `GET /api/aois`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub aois: Vec<WireAoi>,
}

/// Body of `GET /api/aois/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    pub aoi: WireAoi,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Failure body: `{ "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

// =============================================================================
// TRAIT
// =============================================================================

/// Remote AOI store.
#[async_trait]
pub trait AoiApi: Send + Sync {
    /// Every persisted AOI.
    async fn list(&self) -> Result<Vec<WireAoi>, NetworkError>;

    /// One AOI by identity.
    async fn get(&self, id: &AoiId) -> Result<WireAoi, NetworkError>;

    /// Persist a new AOI; the response carries at least the assigned identity.
    async fn create(&self, request: &CreateRequest) -> Result<WireAoi, NetworkError>;

    async fn delete(&self, id: &AoiId) -> Result<(), NetworkError>;

    /// Backend health status string (`"healthy"`).
    async fn health(&self) -> Result<String, NetworkError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpAoiApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAoiApi {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| NetworkError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read(response: reqwest::Response) -> Result<String, NetworkError> {
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| NetworkError::Request(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(NetworkError::Status { status, message: failure_message(status, &text) });
        }
        Ok(text)
    }
}

#[async_trait]
impl AoiApi for HttpAoiApi {
    async fn list(&self) -> Result<Vec<WireAoi>, NetworkError> {
        let url = collection_url(&self.base_url)?;
        debug!(%url, "GET");
        let response = self.http.get(url).send().await.map_err(|e| NetworkError::Request(e.to_string()))?;
        let text = Self::read(response).await?;
        let body: ListResponse = parse_body(&text)?;
        Ok(body.aois)
    }

    async fn get(&self, id: &AoiId) -> Result<WireAoi, NetworkError> {
        let url = item_url(&self.base_url, id)?;
        debug!(%url, "GET");
        let response = self.http.get(url).send().await.map_err(|e| NetworkError::Request(e.to_string()))?;
        let text = Self::read(response).await?;
        let body: GetResponse = parse_body(&text)?;
        Ok(body.aoi)
    }

    async fn create(&self, request: &CreateRequest) -> Result<WireAoi, NetworkError> {
        let url = collection_url(&self.base_url)?;
        debug!(%url, name = %request.name, "POST");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| NetworkError::Request(e.to_string()))?;
        let text = Self::read(response).await?;
        parse_body(&text)
    }

    async fn delete(&self, id: &AoiId) -> Result<(), NetworkError> {
        let url = item_url(&self.base_url, id)?;
        debug!(%url, "DELETE");
        let response = self.http.delete(url).send().await.map_err(|e| NetworkError::Request(e.to_string()))?;
        Self::read(response).await?;
        Ok(())
    }

    async fn health(&self) -> Result<String, NetworkError> {
        let url = endpoint(&self.base_url, &["api", "health"])?;
        let response = self.http.get(url).send().await.map_err(|e| NetworkError::Request(e.to_string()))?;
        let text = Self::read(response).await?;
        let body: HealthResponse = parse_body(&text)?;
        Ok(body.status)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn collection_url(base_url: &str) -> Result<reqwest::Url, NetworkError> {
    endpoint(base_url, &["api", "aois"])
}

/// The identity travels as one percent-encoded path segment, so `?`, `#` and
/// `/` inside a text identity never reach another resource.
fn item_url(base_url: &str, id: &AoiId) -> Result<reqwest::Url, NetworkError> {
    let id = id.to_string();
    endpoint(base_url, &["api", "aois", id.as_str()])
}

fn endpoint(base_url: &str, segments: &[&str]) -> Result<reqwest::Url, NetworkError> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| NetworkError::Request(format!("invalid base URL {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| NetworkError::Request(format!("base URL cannot carry a path: {base_url}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse_body<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, NetworkError> {
    serde_json::from_str(text).map_err(|e| NetworkError::Parse(e.to_string()))
}

/// Human-readable failure text: the server's `message` when the body carries
/// one, otherwise the raw body, otherwise a generic status line.
#[must_use]
pub fn failure_message(status: u16, body: &str) -> String {
    if let Ok(MessageBody { message }) = serde_json::from_str::<MessageBody>(body) {
        if !message.trim().is_empty() {
            return message;
        }
    }
    let body = body.trim();
    if body.is_empty() { format!("request failed with status {status}") } else { body.to_string() }
}

/// String-encode the bare geometry of a feature for the wire.
///
/// # Errors
///
/// Returns [`GeometryError::MissingGeometry`] for a feature without geometry,
/// or [`GeometryError::Encode`] if serialization fails.
pub fn encode_geometry(feature: &Feature) -> Result<String, GeometryError> {
    let geometry = feature.geometry.as_ref().ok_or(GeometryError::MissingGeometry)?;
    serde_json::to_string(geometry).map_err(|e| GeometryError::Encode(e.to_string()))
}

/// Decode wire geometry into a properties-free feature. Accepts a bare
/// geometry or a feature, either as a JSON string or an inline object.
///
/// # Errors
///
/// Returns [`GeometryError::Decode`] for unparseable input or a feature
/// collection, and [`GeometryError::MissingGeometry`] for a feature without one.
pub fn decode_geometry(raw: &serde_json::Value) -> Result<Feature, GeometryError> {
    let parsed = match raw {
        serde_json::Value::String(text) => text.parse::<GeoJson>(),
        other => GeoJson::from_json_value(other.clone()),
    }
    .map_err(|e| GeometryError::Decode(e.to_string()))?;

    let geometry: Geometry = match parsed {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(feature) => feature.geometry.ok_or(GeometryError::MissingGeometry)?,
        GeoJson::FeatureCollection(_) => {
            return Err(GeometryError::Decode("expected a geometry, got a feature collection".into()));
        }
    };
    Ok(Feature { bbox: None, geometry: Some(geometry), id: None, properties: None, foreign_members: None })
}
