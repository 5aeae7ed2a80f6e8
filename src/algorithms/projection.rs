//! Local planar projection anchored at a reference point
//!
//! Drive-test groups span at most a few kilometres, so an equirectangular
//! projection scaled by a fixed meters-per-degree constant is accurate enough
//! and exactly invertible.

use nalgebra::Vector2;
use std::f64::consts::PI;

use crate::core::Position;

/// Projects `(lat, lon)` onto a local x/y plane in meters. x is east, y is north.
#[derive(Debug, Clone, Copy)]
pub struct PlanarProjection {
    reference: Position,
    meters_per_degree: f64,
    cos_ref_lat: f64,
}

impl PlanarProjection {
    pub fn new(reference: Position, meters_per_degree: f64) -> Self {
        Self {
            reference,
            meters_per_degree,
            cos_ref_lat: (reference.lat * PI / 180.0).cos(),
        }
    }

    pub fn to_local(&self, pos: &Position) -> Vector2<f64> {
        let x = (pos.lon - self.reference.lon) * self.meters_per_degree * self.cos_ref_lat;
        let y = (pos.lat - self.reference.lat) * self.meters_per_degree;
        Vector2::new(x, y)
    }

    pub fn to_geodetic(&self, local: &Vector2<f64>) -> Position {
        let lon = local.x / self.meters_per_degree / self.cos_ref_lat + self.reference.lon;
        let lat = local.y / self.meters_per_degree + self.reference.lat;
        Position::new(lat, lon)
    }
}

/// Convert geodetic coordinates to local meters relative to `(lat_ref, lon_ref)`
pub fn to_local_xy(lat: f64, lon: f64, lat_ref: f64, lon_ref: f64, meters_per_degree: f64) -> (f64, f64) {
    let local = PlanarProjection::new(Position::new(lat_ref, lon_ref), meters_per_degree)
        .to_local(&Position::new(lat, lon));
    (local.x, local.y)
}

/// Inverse of [`to_local_xy`]
pub fn to_lat_lon(x: f64, y: f64, lat_ref: f64, lon_ref: f64, meters_per_degree: f64) -> (f64, f64) {
    let pos = PlanarProjection::new(Position::new(lat_ref, lon_ref), meters_per_degree)
        .to_geodetic(&Vector2::new(x, y));
    (pos.lat, pos.lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::METERS_PER_DEGREE;

    #[test]
    fn test_reference_maps_to_origin() {
        let (x, y) = to_local_xy(32.7157, -117.1611, 32.7157, -117.1611, METERS_PER_DEGREE);
        assert_eq!(x, 0.0);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn test_roundtrip() {
        let references = [(32.7157, -117.1611), (-33.9, 18.4), (0.0, 0.0), (64.1, -21.9)];
        let points = [(32.7200, -117.1500), (-34.0, 18.5), (0.01, -0.01), (64.0, -22.0)];

        for &(lat_ref, lon_ref) in &references {
            for &(lat, lon) in &points {
                let (x, y) = to_local_xy(lat, lon, lat_ref, lon_ref, METERS_PER_DEGREE);
                let (lat2, lon2) = to_lat_lon(x, y, lat_ref, lon_ref, METERS_PER_DEGREE);
                assert!((lat - lat2).abs() < 1e-9, "Latitude mismatch: {} vs {}", lat, lat2);
                assert!((lon - lon2).abs() < 1e-9, "Longitude mismatch: {} vs {}", lon, lon2);
            }
        }
    }

    #[test]
    fn test_scale_at_equator() {
        let projection = PlanarProjection::new(Position::new(0.0, 0.0), METERS_PER_DEGREE);
        let local = projection.to_local(&Position::new(0.001, 0.001));
        assert!((local.x - 111.139).abs() < 1e-6);
        assert!((local.y - 111.139).abs() < 1e-6);
    }
}
