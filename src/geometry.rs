// src/geometry.rs

//! Pure geospatial primitives used by the zone resolver.
//!
//! Everything here is stateless and numeric: ray-casting containment,
//! haversine distance, initial compass bearing and a vertex-based radius
//! test. Malformed geometry surfaces as a `Geometry` error rather than a
//! silent default.

use crate::error::{AppError, Result};
use crate::models::{GeoPoint, Geometry};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// The 16-point compass rose, one label per 22.5 degree sector.
const COMPASS_ROSE: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Ray-casting containment test for polygon and multipolygon geometry.
///
/// Crossing parity is accumulated over every ring, so interior holes are
/// honored. A point exactly on a boundary edge or vertex counts as outside;
/// the strict comparison keeps the choice consistent everywhere.
pub fn point_in_polygon(point: &GeoPoint, geometry: &Geometry) -> Result<bool> {
    match geometry {
        Geometry::Polygon { coordinates } => rings_contain(point, coordinates),
        Geometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                if rings_contain(point, polygon)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Geometry::Point { .. } | Geometry::MultiPoint { .. } => Err(AppError::geometry(
            "containment requires polygon or multipolygon geometry",
        )),
    }
}

fn rings_contain(point: &GeoPoint, rings: &[Vec<Vec<f64>>]) -> Result<bool> {
    if rings.is_empty() {
        return Err(AppError::geometry("polygon has no rings"));
    }
    let x = point.longitude;
    let y = point.latitude;
    let mut inside = false;

    for ring in rings {
        if ring.len() < 3 {
            return Err(AppError::geometry(format!(
                "ring has {} positions, expected at least 3",
                ring.len()
            )));
        }
        let mut j = ring.len() - 1;
        for i in 0..ring.len() {
            let (xi, yi) = lon_lat(&ring[i])?;
            let (xj, yj) = lon_lat(&ring[j])?;
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    Ok(inside)
}

fn lon_lat(pos: &[f64]) -> Result<(f64, f64)> {
    match pos {
        [lon, lat, ..] => Ok((*lon, *lat)),
        _ => Err(AppError::geometry("position missing coordinates")),
    }
}

/// Great-circle (haversine) distance between two points, in meters.
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// True if any vertex of the geometry lies within `radius_m` of `point`.
pub fn geometry_within_radius(geometry: &Geometry, point: &GeoPoint, radius_m: f64) -> Result<bool> {
    let vertices = geometry.vertices()?;
    Ok(vertices
        .iter()
        .any(|v| distance_meters(point, v) <= radius_m))
}

/// Forward azimuth from `a` to `b` as a 16-point compass label plus degrees.
///
/// The circle is split into 16 equal sectors and the bearing rounded to the
/// nearest sector index, wrapping at 360.
pub fn initial_bearing(a: &GeoPoint, b: &GeoPoint) -> (&'static str, i32) {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let yy = dlon.sin() * lat2.cos();
    let xx = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let degrees = (yy.atan2(xx).to_degrees() + 360.0) % 360.0;

    let sector = (degrees / 22.5).round() as usize % COMPASS_ROSE.len();
    (COMPASS_ROSE[sector], degrees.round() as i32 % 360)
}
