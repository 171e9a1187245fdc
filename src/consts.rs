//! Shared numeric constants for the geoscan crate.

// ── Geodesy ─────────────────────────────────────────────────────

/// Mean Earth radius in meters used for geodesic ring area.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Square meters per square kilometer.
pub const M2_PER_KM2: f64 = 1_000_000.0;

/// Decimal places kept for AOI area (km²).
pub const AREA_DECIMALS: i32 = 2;

/// Decimal places kept for AOI center coordinates (degrees).
pub const CENTER_DECIMALS: i32 = 6;

// ── Viewport ────────────────────────────────────────────────────

/// Web-mercator tile edge in pixels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Highest zoom level the base map serves.
pub const MAX_ZOOM: f64 = 19.0;

/// Latitude limit of the web-mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Padding kept around a framed AOI, in screen pixels.
pub const FIT_PADDING_PX: f64 = 16.0;

/// Initial map center as `[longitude, latitude]`.
pub const DEFAULT_CENTER: [f64; 2] = [-0.09, 51.505];

/// Initial map zoom.
pub const DEFAULT_ZOOM: f64 = 13.0;
