// src/models/geojson.rs

//! Typed subset of GeoJSON as published by the DPC feeds.
//!
//! Only the shapes the bulletins actually use are modeled: zone documents
//! carry `Polygon`/`MultiPolygon` features, phenomena documents carry
//! `Point` features. Properties stay an open map because the two feeds
//! disagree on key casing; normalization happens in the zone resolver.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// A geographic coordinate, latitude/longitude in degrees.
///
/// Supplied once at construction (the configured device location) and never
/// mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// GeoJSON geometry. Positions are `[longitude, latitude, ...]` arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

impl Geometry {
    /// All vertices of the geometry as points.
    ///
    /// Fails with a geometry error when a position array is missing its
    /// longitude/latitude components or the geometry is empty.
    pub fn vertices(&self) -> Result<Vec<GeoPoint>> {
        let mut points = Vec::new();
        match self {
            Geometry::Point { coordinates } => {
                points.push(position(coordinates)?);
            }
            Geometry::MultiPoint { coordinates } => {
                for pos in coordinates {
                    points.push(position(pos)?);
                }
            }
            Geometry::Polygon { coordinates } => {
                for ring in coordinates {
                    for pos in ring {
                        points.push(position(pos)?);
                    }
                }
            }
            Geometry::MultiPolygon { coordinates } => {
                for polygon in coordinates {
                    for ring in polygon {
                        for pos in ring {
                            points.push(position(pos)?);
                        }
                    }
                }
            }
        }
        if points.is_empty() {
            return Err(AppError::geometry("geometry has no coordinates"));
        }
        Ok(points)
    }
}

/// Convert a GeoJSON position array into a point.
fn position(pos: &[f64]) -> Result<GeoPoint> {
    match pos {
        [longitude, latitude, ..] => Ok(GeoPoint::new(*latitude, *longitude)),
        _ => Err(AppError::geometry(format!(
            "position has {} components, expected at least 2",
            pos.len()
        ))),
    }
}

/// A single GeoJSON feature: geometry plus an open property map.
///
/// Read-only once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,

    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A GeoJSON feature collection, one per fetched bulletin document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}
