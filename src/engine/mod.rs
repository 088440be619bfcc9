// src/engine/mod.rs

//! Alert cache, rollover state machine and refresh orchestration.

mod cache;
mod refresh;

pub use cache::{FeedCache, RefreshPlan};
pub use refresh::Engine;
