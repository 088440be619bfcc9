// src/engine/refresh.rs

//! Refresh orchestrator.
//!
//! The single externally invoked entry point. The host calls `refresh()` on
//! a fixed timer (serialized per location); one cycle resolves both feed
//! identifiers concurrently, decides the per-feed branch, fetches the
//! scheduled documents concurrently, resolves zones and merges into the
//! caches, then hands back the combined snapshot.

use std::collections::HashSet;

use chrono::Local;
use reqwest::Client;

use crate::engine::cache::{FeedCache, RefreshPlan};
use crate::error::{AppError, Result};
use crate::models::{
    BulletinKind, CriticalityDay, EngineConfig, Snapshot, VigilanceDay,
};
use crate::services::{BulletinResolver, FeedFetcher, ZoneResolver, create_client};

/// Engine state for one configured location.
///
/// Owns the per-feed caches and is mutated only inside `refresh()`; the
/// host must not run two refresh cycles for the same location at once.
pub struct Engine {
    config: EngineConfig,
    client: Client,
    zone_resolver: ZoneResolver,
    criticality: FeedCache<CriticalityDay>,
    vigilance: FeedCache<VigilanceDay>,
    pending_full_refresh: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let client = create_client(&config.polling)?;
        let zone_resolver = ZoneResolver::new(
            config.location.point(),
            config.location.municipality.clone(),
            config.location.radius_km,
        );
        Ok(Self {
            config,
            client,
            zone_resolver,
            criticality: FeedCache::new(BulletinKind::Criticality),
            vigilance: FeedCache::new(BulletinKind::Vigilance),
            pending_full_refresh: false,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// True when a slot or scheduled URL is still missing and the host
    /// should retry out of band.
    pub fn requires_full_refresh(&self) -> bool {
        self.criticality.requires_full_refresh() || self.vigilance.requires_full_refresh()
    }

    /// Run one refresh cycle and return the current snapshot.
    ///
    /// Fails only when neither feed identifier resolved *and* the caches
    /// were never populated; with previous data present the old snapshot is
    /// returned unchanged and a full refresh stays pending.
    pub async fn refresh(&mut self) -> Result<Snapshot> {
        let resolver = BulletinResolver::new(&self.client);
        let now = Local::now().naive_local();
        let today = now.date();

        let (criticality_id, vigilance_id) = tokio::join!(
            resolver.latest_id(
                BulletinKind::Criticality,
                &self.config.endpoints.criticality,
                today
            ),
            resolver.latest_id(
                BulletinKind::Vigilance,
                &self.config.endpoints.vigilance,
                today
            ),
        );
        log::debug!(
            "[{}] ids: criticality {:?} - vigilance {:?}",
            self.config.location.name,
            criticality_id,
            vigilance_id
        );

        if criticality_id.is_none() && vigilance_id.is_none() {
            self.pending_full_refresh = true;
            if self.criticality.snapshot().is_none() && self.vigilance.snapshot().is_none() {
                return Err(AppError::StaleData);
            }
            log::warn!(
                "[{}] no bulletin identifiers resolvable, keeping previous data",
                self.config.location.name
            );
            return Ok(self.snapshot());
        }

        let interval = self.config.polling.interval();
        let criticality_plan = self.criticality.plan_refresh(
            criticality_id.as_ref(),
            &self.config.endpoints.criticality,
            now,
            interval,
        )?;
        let vigilance_plan = self.vigilance.plan_refresh(
            vigilance_id.as_ref(),
            &self.config.endpoints.vigilance,
            now,
            interval,
        )?;

        let criticality_urls: HashSet<String> =
            self.criticality.pending_urls().into_iter().collect();
        let mut urls = self.criticality.pending_urls();
        urls.extend(self.vigilance.pending_urls());

        if !urls.is_empty() {
            let fetcher = FeedFetcher::new(&self.client);
            let outcome = fetcher.fetch_all(&urls).await;
            log::debug!(
                "[{}] fetched {}/{} scheduled documents",
                self.config.location.name,
                outcome.documents.len(),
                outcome.scheduled
            );

            for document in &outcome.documents {
                if criticality_urls.contains(&document.url) {
                    self.criticality.merge_document(
                        document,
                        &self.zone_resolver,
                        &self.config.endpoints.criticality,
                    );
                } else {
                    self.vigilance.merge_document(
                        document,
                        &self.zone_resolver,
                        &self.config.endpoints.vigilance,
                    );
                }
            }

            // A publication not dated today was merged into forward slots;
            // shift it into place now that the batch applied.
            if matches!(
                criticality_plan,
                RefreshPlan::NewPublication {
                    swap_after_merge: true
                }
            ) {
                self.criticality.rollover(today);
            }
            if matches!(
                vigilance_plan,
                RefreshPlan::NewPublication {
                    swap_after_merge: true
                }
            ) {
                self.vigilance.rollover(today);
            }
        }

        let stamp = Local::now();
        if criticality_id.is_some() {
            if let Some(snapshot) = self.criticality.snapshot_mut() {
                snapshot.last_update = stamp;
            }
        }
        if vigilance_id.is_some() {
            if let Some(snapshot) = self.vigilance.snapshot_mut() {
                snapshot.last_update = stamp;
            }
        }

        self.pending_full_refresh = self.requires_full_refresh();
        if self.pending_full_refresh {
            log::warn!(
                "[{}] refresh incomplete, retry advised in {}s",
                self.config.location.name,
                self.config.polling.retry_after_secs
            );
        }
        Ok(self.snapshot())
    }

    /// Assemble the outbound two-feed snapshot from the current caches.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            last_update: Local::now(),
            criticality: self.criticality.snapshot().cloned(),
            vigilance: self.vigilance.snapshot().cloned(),
            requires_full_refresh: self.pending_full_refresh,
            retry_after_secs: self
                .pending_full_refresh
                .then_some(self.config.polling.retry_after_secs),
            warning_level: self.config.location.warning_level,
        }
    }
}
