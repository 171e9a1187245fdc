//! Geometry metrics: geodesic area and centroid of a drawn shape.
//!
//! DESIGN
//! ======
//! Area uses the spherical ring formula (Chamberlain & Duquette) on a sphere of
//! mean Earth radius; exterior rings add and holes subtract. The center is the
//! planar centroid of the shape in degrees, not the bounding-box center. Both
//! are rounded once here so every caller sees identical values for identical
//! geometry.

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_test;

use geo::{Centroid, Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, PolygonType, Value};
use serde::{Deserialize, Serialize};

use crate::consts::{AREA_DECIMALS, CENTER_DECIMALS, EARTH_RADIUS_M, M2_PER_KM2};
use crate::error::GeometryError;

/// Derived metrics of an AOI geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Area in km², rounded to 2 decimals.
    pub area: f64,
    /// Centroid as `[longitude, latitude]`, rounded to 6 decimals.
    pub center: [f64; 2],
}

/// Compute area and centroid for a polygonal feature.
///
/// # Errors
///
/// Returns a [`GeometryError`] if the feature has no geometry, is not a
/// polygon/multipolygon, or contains malformed rings.
pub fn compute(feature: &Feature) -> Result<Metrics, GeometryError> {
    let shape = polygonal(feature)?;
    let area_m2 = geodesic_area(&shape);
    let centroid = shape.centroid().ok_or(GeometryError::NoCentroid)?;
    Ok(Metrics {
        area: round_to(area_m2 / M2_PER_KM2, AREA_DECIMALS),
        center: [round_to(centroid.x(), CENTER_DECIMALS), round_to(centroid.y(), CENTER_DECIMALS)],
    })
}

/// Extract the feature's geometry as a multipolygon.
///
/// # Errors
///
/// Returns a [`GeometryError`] for missing, non-polygonal, or malformed geometry.
pub fn polygonal(feature: &Feature) -> Result<MultiPolygon<f64>, GeometryError> {
    let geometry = feature.geometry.as_ref().ok_or(GeometryError::MissingGeometry)?;
    polygonal_value(&geometry.value)
}

/// Convert a GeoJSON geometry value into a multipolygon.
///
/// # Errors
///
/// Returns a [`GeometryError`] for non-polygonal or malformed geometry.
pub fn polygonal_value(value: &Value) -> Result<MultiPolygon<f64>, GeometryError> {
    match value {
        Value::Polygon(rings) => Ok(MultiPolygon(vec![polygon_from_rings(rings)?])),
        Value::MultiPolygon(polygons) => {
            let polygons = polygons
                .iter()
                .map(polygon_from_rings)
                .collect::<Result<Vec<_>, _>>()?;
            if polygons.is_empty() {
                return Err(GeometryError::InvalidRing);
            }
            Ok(MultiPolygon(polygons))
        }
        other => Err(GeometryError::UnsupportedType(type_name(other).to_owned())),
    }
}

fn polygon_from_rings(rings: &PolygonType) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings.iter().map(|ring| line_string(ring));
    let exterior = rings.next().ok_or(GeometryError::InvalidRing)??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    // Polygon::new closes any open ring.
    Ok(Polygon::new(exterior, interiors))
}

fn line_string(ring: &[Vec<f64>]) -> Result<LineString<f64>, GeometryError> {
    if ring.len() < 3 {
        return Err(GeometryError::InvalidRing);
    }
    let coords = ring
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            [_, _, ..] => Err(GeometryError::NonFinite),
            _ => Err(GeometryError::InvalidRing),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Geodesic area of a multipolygon in square meters.
#[must_use]
pub fn geodesic_area(shape: &MultiPolygon<f64>) -> f64 {
    shape.0.iter().map(polygon_area).sum()
}

fn polygon_area(polygon: &Polygon<f64>) -> f64 {
    let holes: f64 = polygon.interiors().iter().map(ring_area).sum();
    (ring_area(polygon.exterior()) - holes).max(0.0)
}

/// Unsigned spherical area of a closed ring in square meters.
fn ring_area(ring: &LineString<f64>) -> f64 {
    let coords = &ring.0;
    // Closed ring: the last coordinate repeats the first.
    let unique = coords.len().saturating_sub(1);
    if unique < 3 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..unique {
        let lower = coords[i];
        let middle = coords[(i + 1) % unique];
        let upper = coords[(i + 2) % unique];
        total += (upper.x.to_radians() - lower.x.to_radians()) * middle.y.to_radians().sin();
    }
    (total * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs()
}

/// Round half away from zero to `places` decimals.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
