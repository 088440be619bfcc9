// src/models/mod.rs

//! Domain models for the bulletin engine.

mod bulletin;
mod config;
mod geojson;

// Re-export all public types
pub use bulletin::{
    BulletinId, BulletinKind, BulletinSnapshot, CriticalityDay, DaySlot, Phenomenon,
    RiskAssessment, RiskKind, Snapshot, VigilanceDay,
};
pub use config::{EngineConfig, Endpoints, FeedEndpoints, LocationConfig, PollingConfig};
pub use geojson::{Feature, FeatureCollection, GeoPoint, Geometry};
