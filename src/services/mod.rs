// src/services/mod.rs

//! Services for bulletin discovery, retrieval and zone resolution.

mod fetcher;
mod resolver;
mod zones;

pub use fetcher::{FeedFetcher, FetchOutcome, FetchedDocument, create_client};
pub use resolver::BulletinResolver;
pub use zones::{ZoneProperties, ZoneResolver};
