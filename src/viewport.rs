//! Bounds and viewport math for framing an AOI on the map.
//!
//! `Bounds` is a lon/lat bounding box. `Viewport` is the map's center and
//! zoom; [`Viewport::fit`] computes the web-mercator view that shows a box
//! inside a screen of a given size, snapping zoom down to a whole level the
//! way slippy maps do.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use std::f64::consts::PI;

use geo::BoundingRect;
use geojson::Feature;

use crate::consts::{DEFAULT_CENTER, DEFAULT_ZOOM, MAX_MERCATOR_LAT, MAX_ZOOM, TILE_SIZE_PX};
use crate::error::GeometryError;
use crate::metrics;

/// Axis-aligned lon/lat bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    /// Bounding box of a polygonal feature.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] if the feature is not a valid polygon.
    pub fn of(feature: &Feature) -> Result<Self, GeometryError> {
        let shape = metrics::polygonal(feature)?;
        let rect = shape.bounding_rect().ok_or(GeometryError::DegenerateBounds)?;
        Ok(Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Midpoint as `[longitude, latitude]`.
    #[must_use]
    pub fn center(&self) -> [f64; 2] {
        [(self.west + self.east) / 2.0, (self.south + self.north) / 2.0]
    }

    /// Whether `[lon, lat]` lies inside or on the edge of the box.
    #[must_use]
    pub fn contains(&self, point: [f64; 2]) -> bool {
        (self.west..=self.east).contains(&point[0]) && (self.south..=self.north).contains(&point[1])
    }

    /// True when the box cannot be framed: non-finite or zero extent on either axis.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.west, self.south, self.east, self.north].iter().all(|v| v.is_finite());
        !finite || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Return `self` if it can be framed.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::DegenerateBounds`] when [`Bounds::is_degenerate`] holds.
    pub fn validated(self) -> Result<Self, GeometryError> {
        if self.is_degenerate() {
            return Err(GeometryError::DegenerateBounds);
        }
        Ok(self)
    }
}

/// Map view: center `[longitude, latitude]` and zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: [f64; 2],
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { center: DEFAULT_CENTER, zoom: DEFAULT_ZOOM }
    }
}

impl Viewport {
    /// The largest whole zoom at which `bounds` fits inside a `width` x `height`
    /// pixel screen with `padding` pixels kept free on every side.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::DegenerateBounds`] for a zero-extent box.
    pub fn fit(bounds: Bounds, width: f64, height: f64, padding: f64) -> Result<Self, GeometryError> {
        let bounds = bounds.validated()?;
        let usable_w = (width - 2.0 * padding).max(1.0);
        let usable_h = (height - 2.0 * padding).max(1.0);

        let (x_west, y_north) = project(bounds.west, bounds.north);
        let (x_east, y_south) = project(bounds.east, bounds.south);
        let span_x = (x_east - x_west).abs();
        let span_y = (y_south - y_north).abs();

        let zoom_x = (usable_w / (TILE_SIZE_PX * span_x)).log2();
        let zoom_y = (usable_h / (TILE_SIZE_PX * span_y)).log2();
        let zoom = zoom_x.min(zoom_y).floor().clamp(0.0, MAX_ZOOM);

        let (lon, lat) = unproject((x_west + x_east) / 2.0, (y_north + y_south) / 2.0);
        Ok(Self { center: [lon, lat], zoom })
    }
}

/// Web-mercator projection to unit square coordinates (x right, y down).
fn project(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (lon + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
    (x, y)
}

fn unproject(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    (lon, lat)
}
