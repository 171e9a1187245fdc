//! Error taxonomy for the AOI engine.
//!
//! ERROR HANDLING
//! ==============
//! Geometry errors abort the current gesture, network errors leave the record
//! store untouched, and validation errors keep the pending draft alive for
//! correction. None of them is fatal to the host: the map and the draw tool
//! stay usable after any single failure.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use crate::doc::AoiId;

/// Stable machine-readable code for an error, suitable for logs and hosts.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

/// A shape that cannot be turned into an AOI.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// The feature carries no geometry at all.
    #[error("feature has no geometry")]
    MissingGeometry,

    /// The geometry is not a polygon or multipolygon.
    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),

    /// A ring has fewer than three positions, or a position lacks coordinates.
    #[error("polygon ring is malformed")]
    InvalidRing,

    /// A coordinate is NaN or infinite.
    #[error("geometry contains non-finite coordinates")]
    NonFinite,

    /// The shape has no centroid (empty geometry).
    #[error("geometry has no centroid")]
    NoCentroid,

    /// The bounding box has zero extent, so the viewport cannot frame it.
    #[error("bounds are degenerate (zero extent)")]
    DegenerateBounds,

    /// The geometry could not be serialized for the wire.
    #[error("geometry encode failed: {0}")]
    Encode(String),

    /// The wire geometry could not be parsed as GeoJSON.
    #[error("geometry decode failed: {0}")]
    Decode(String),
}

/// A failed round-trip to the AOI backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// Top-level error for engine, controller, and gateway operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AoiError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    /// User input rejected (e.g. blank name on commit).
    #[error("{0}")]
    Validation(String),

    /// No record with this identity is in the store.
    #[error("AOI not found: {0}")]
    NotFound(AoiId),

    /// The call is not valid in the controller's current state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

impl ErrorCode for GeometryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DegenerateBounds => "E_DEGENERATE_BOUNDS",
            Self::Encode(_) | Self::Decode(_) => "E_GEOMETRY_CODEC",
            Self::MissingGeometry | Self::UnsupportedType(_) | Self::InvalidRing | Self::NonFinite | Self::NoCentroid => {
                "E_GEOMETRY"
            }
        }
    }
}

impl ErrorCode for NetworkError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_NETWORK_REQUEST",
            Self::Status { .. } => "E_NETWORK_STATUS",
            Self::Parse(_) => "E_NETWORK_PARSE",
            Self::ClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

impl ErrorCode for AoiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Geometry(e) => e.error_code(),
            Self::Network(e) => e.error_code(),
            Self::Validation(_) => "E_VALIDATION",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::InvalidState(_) => "E_INVALID_STATE",
        }
    }
}
