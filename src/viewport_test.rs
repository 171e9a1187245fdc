#![allow(clippy::float_cmp)]

use super::*;
use crate::test_helpers::{polygon_feature, rect_feature};

// =============================================================
// Bounds
// =============================================================

#[test]
fn bounds_of_rectangle() {
    let b = Bounds::of(&rect_feature(-1.0, 2.0, 3.0, 4.0)).unwrap();
    assert_eq!(b, Bounds::new(-1.0, 2.0, 3.0, 4.0));
    assert_eq!(b.width(), 4.0);
    assert_eq!(b.height(), 2.0);
    assert_eq!(b.center(), [1.0, 3.0]);
}

#[test]
fn bounds_contains_edges() {
    let b = Bounds::new(0.0, 0.0, 1.0, 1.0);
    assert!(b.contains([0.0, 0.0]));
    assert!(b.contains([1.0, 0.5]));
    assert!(!b.contains([1.1, 0.5]));
}

#[test]
fn single_point_polygon_is_degenerate() {
    let collapsed = polygon_feature(&[[5.0, 5.0], [5.0, 5.0], [5.0, 5.0], [5.0, 5.0]]);
    let b = Bounds::of(&collapsed).unwrap();
    assert!(b.is_degenerate());
    assert_eq!(b.validated(), Err(GeometryError::DegenerateBounds));
}

#[test]
fn flat_box_is_degenerate() {
    assert!(Bounds::new(0.0, 1.0, 2.0, 1.0).is_degenerate());
    assert!(Bounds::new(0.0, 0.0, f64::NAN, 1.0).is_degenerate());
    assert!(!Bounds::new(0.0, 0.0, 0.1, 0.1).is_degenerate());
}

// =============================================================
// Viewport
// =============================================================

#[test]
fn default_viewport_matches_initial_map_view() {
    let v = Viewport::default();
    assert_eq!(v.center, [-0.09, 51.505]);
    assert_eq!(v.zoom, 13.0);
}

#[test]
fn fit_one_degree_square() {
    let v = Viewport::fit(Bounds::new(0.0, 0.0, 1.0, 1.0), 800.0, 600.0, 0.0).unwrap();
    assert_eq!(v.zoom, 9.0);
    assert!((v.center[0] - 0.5).abs() < 1e-9);
    assert!((v.center[1] - 0.5).abs() < 1e-3);
}

#[test]
fn smaller_box_zooms_further_in() {
    let wide = Viewport::fit(Bounds::new(0.0, 0.0, 1.0, 1.0), 800.0, 600.0, 16.0).unwrap();
    let tight = Viewport::fit(Bounds::new(0.0, 0.0, 0.01, 0.01), 800.0, 600.0, 16.0).unwrap();
    assert!(tight.zoom > wide.zoom);
}

#[test]
fn zoom_is_clamped_to_max() {
    let v = Viewport::fit(Bounds::new(0.0, 0.0, 1e-9, 1e-9), 800.0, 600.0, 0.0).unwrap();
    assert_eq!(v.zoom, MAX_ZOOM);
}

#[test]
fn whole_world_fits_at_zoom_zero() {
    let v = Viewport::fit(Bounds::new(-180.0, -85.0, 180.0, 85.0), 256.0, 256.0, 0.0).unwrap();
    assert_eq!(v.zoom, 0.0);
}

#[test]
fn fit_rejects_degenerate_bounds() {
    let result = Viewport::fit(Bounds::new(5.0, 5.0, 5.0, 5.0), 800.0, 600.0, 0.0);
    assert_eq!(result, Err(GeometryError::DegenerateBounds));
}

#[test]
fn projection_round_trips() {
    let (x, y) = project(12.5, 41.9);
    let (lon, lat) = unproject(x, y);
    assert!((lon - 12.5).abs() < 1e-9);
    assert!((lat - 41.9).abs() < 1e-9);
}
