// src/lib.rs

//! DPC bulletin ingestion and zone-resolution engine.
//!
//! Polls the Civil Protection criticality and vigilance feeds, resolves the
//! configured location against the bulletins' zone polygons and maintains a
//! rolling three-day alert snapshot for the host to read.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod models;
pub mod services;
