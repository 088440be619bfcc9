// src/engine/cache.rs

//! Per-feed alert cache and day-rollover state machine.
//!
//! Each feed's cache moves between two states: `Empty` (no snapshot yet)
//! and `Populated` (id, publication date and at least partial day data).
//! Three transitions exist per refresh cycle:
//!
//! - new publication observed: day slots cleared, per-day URLs scheduled
//!   (a stale "today" is dropped from the schedule, the shift is deferred
//!   until after the merge);
//! - same publication inside the post-midnight window: rollover, shifting
//!   tomorrow into today exactly once per calendar boundary;
//! - same publication otherwise: no-op, only the update stamp moves.

use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use crate::catalog;
use crate::error::Result;
use crate::models::{
    BulletinId, BulletinKind, BulletinSnapshot, CriticalityDay, DaySlot, FeedEndpoints,
    RiskAssessment, VigilanceDay,
};
use crate::services::{FetchedDocument, ZoneResolver};

/// What a per-day URL is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Zone classification polygons
    Zones,
    /// Discrete phenomena points (vigilance only)
    Phenomena,
}

/// A URL scheduled for the current publication, with its day slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledUrl {
    pub url: String,
    pub day: DaySlot,
    pub document: DocumentKind,
}

/// Outcome of the per-feed branch decision.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshPlan {
    /// New publication: the listed URLs must be fetched; when the
    /// publication is not dated today, a rollover is owed after the merge.
    NewPublication { swap_after_merge: bool },
    /// Same publication, post-midnight window: day slots were shifted.
    RolledOver,
    /// Nothing to do beyond bumping the update stamp.
    Unchanged,
}

/// Mutable cache for one feed.
#[derive(Debug)]
pub struct FeedCache<D> {
    kind: BulletinKind,
    snapshot: Option<BulletinSnapshot<D>>,
    pending: Vec<ScheduledUrl>,
    last_rollover: Option<NaiveDate>,
}

impl<D> FeedCache<D> {
    pub fn new(kind: BulletinKind) -> Self {
        Self {
            kind,
            snapshot: None,
            pending: Vec::new(),
            last_rollover: None,
        }
    }

    pub fn kind(&self) -> BulletinKind {
        self.kind
    }

    pub fn snapshot(&self) -> Option<&BulletinSnapshot<D>> {
        self.snapshot.as_ref()
    }

    pub fn snapshot_mut(&mut self) -> Option<&mut BulletinSnapshot<D>> {
        self.snapshot.as_mut()
    }

    /// URLs scheduled for the current publication and not yet merged.
    pub fn pending_urls(&self) -> Vec<String> {
        self.pending.iter().map(|s| s.url.clone()).collect()
    }

    /// True when the snapshot is absent or a scheduled URL never merged;
    /// the orchestrator schedules an out-of-band retry.
    pub fn requires_full_refresh(&self) -> bool {
        let empty = self
            .snapshot
            .as_ref()
            .map(|s| s.days.is_empty())
            .unwrap_or(true);
        empty || !self.pending.is_empty()
    }

    /// Decide the branch for this cycle given the freshly resolved id.
    pub fn plan_refresh(
        &mut self,
        new_id: Option<&BulletinId>,
        endpoints: &FeedEndpoints,
        now: NaiveDateTime,
        poll_interval: Duration,
    ) -> Result<RefreshPlan> {
        let Some(new_id) = new_id else {
            // Absence of an id keeps the previous snapshot untouched.
            return Ok(RefreshPlan::Unchanged);
        };

        let unchanged = self
            .snapshot
            .as_ref()
            .map(|s| &s.id == new_id)
            .unwrap_or(false);

        if !unchanged {
            let publication_date = new_id.publication_date(self.kind)?;
            let swap_after_merge = publication_date.date() != now.date();

            self.snapshot = Some(BulletinSnapshot::new(
                new_id.clone(),
                publication_date,
                endpoints.bulletin_url.clone(),
            ));
            self.pending = schedule_urls(self.kind, new_id, endpoints, swap_after_merge);
            self.last_rollover = None;

            log::debug!(
                "{} new publication {new_id}, {} urls scheduled, deferred swap: {swap_after_merge}",
                self.kind,
                self.pending.len()
            );
            return Ok(RefreshPlan::NewPublication { swap_after_merge });
        }

        if in_post_midnight_window(now, poll_interval) && self.rollover(now.date()) {
            return Ok(RefreshPlan::RolledOver);
        }

        log::debug!("{} no changes for {new_id}", self.kind);
        Ok(RefreshPlan::Unchanged)
    }

    /// Shift day slots forward: tomorrow becomes today, day-after becomes
    /// tomorrow, the vacated trailing slot is dropped. Runs at most once
    /// per calendar date per feed, no matter how often it is attempted.
    pub fn rollover(&mut self, today: NaiveDate) -> bool {
        if self.last_rollover == Some(today) {
            log::debug!("{} rollover already applied for {today}", self.kind);
            return false;
        }
        let Some(snapshot) = &mut self.snapshot else {
            return false;
        };

        let day_after = snapshot.days.remove(&DaySlot::AfterTomorrow);
        match snapshot.days.remove(&DaySlot::Tomorrow) {
            Some(tomorrow) => {
                snapshot.days.insert(DaySlot::Today, tomorrow);
            }
            None => {
                snapshot.days.remove(&DaySlot::Today);
            }
        }
        if let Some(day_after) = day_after {
            snapshot.days.insert(DaySlot::Tomorrow, day_after);
        }

        self.last_rollover = Some(today);
        log::debug!("{} day slots rolled over for {today}", self.kind);
        true
    }

    fn scheduled_for(&self, url: &str) -> Option<ScheduledUrl> {
        self.pending.iter().find(|s| s.url == url).cloned()
    }

    fn mark_merged(&mut self, url: &str) {
        self.pending.retain(|s| s.url != url);
    }
}

/// Per-day URLs to fetch for a publication. When the publication is not
/// dated today its "today" documents are already stale and are skipped;
/// only forward-looking days are scheduled.
fn schedule_urls(
    kind: BulletinKind,
    id: &BulletinId,
    endpoints: &FeedEndpoints,
    skip_today: bool,
) -> Vec<ScheduledUrl> {
    let days: &[DaySlot] = match kind {
        BulletinKind::Criticality => &[DaySlot::Today, DaySlot::Tomorrow],
        BulletinKind::Vigilance => &[DaySlot::Today, DaySlot::Tomorrow, DaySlot::AfterTomorrow],
    };

    let mut scheduled = Vec::new();
    for &day in days {
        if skip_today && day == DaySlot::Today {
            continue;
        }
        match kind {
            BulletinKind::Criticality => {
                let Some(token) = day.criticality_token() else {
                    continue;
                };
                scheduled.push(ScheduledUrl {
                    url: endpoints.geojson_url(id.as_str(), token),
                    day,
                    document: DocumentKind::Zones,
                });
            }
            BulletinKind::Vigilance => {
                let token = day.italian_token();
                scheduled.push(ScheduledUrl {
                    url: endpoints.geojson_url(id.as_str(), token),
                    day,
                    document: DocumentKind::Zones,
                });
                scheduled.push(ScheduledUrl {
                    url: endpoints.geojson_url(id.as_str(), &format!("fenomeni_{token}")),
                    day,
                    document: DocumentKind::Phenomena,
                });
            }
        }
    }
    scheduled
}

/// Local time is inside the first poll window after midnight.
fn in_post_midnight_window(now: NaiveDateTime, poll_interval: Duration) -> bool {
    let midnight = now.date().and_time(NaiveTime::MIN);
    let window_end = midnight + chrono::Duration::from_std(poll_interval).unwrap_or_default();
    now >= midnight && now <= window_end
}

impl FeedCache<CriticalityDay> {
    /// Merge one fetched criticality document into its day slot.
    ///
    /// A document whose zone cannot be resolved (or whose properties lack
    /// the combined alert string) leaves the slot absent and the URL
    /// pending, so the cycle reports `requires_full_refresh`.
    pub fn merge_document(
        &mut self,
        document: &FetchedDocument,
        resolver: &ZoneResolver,
        endpoints: &FeedEndpoints,
    ) {
        let Some(scheduled) = self.scheduled_for(&document.url) else {
            log::warn!("criticality document for unscheduled url {}", document.url);
            return;
        };
        let Some(props) = resolver.resolve(&document.collection) else {
            log::warn!("criticality zone unresolved for {}", document.url);
            return;
        };
        let Some(snapshot) = self.snapshot.as_mut() else {
            return;
        };

        let day = scheduled.day;
        let Some(alert) = props
            .map_representation
            .as_deref()
            .and_then(catalog::parse_alert_string)
        else {
            log::warn!("criticality zone without map representation for {}", document.url);
            return;
        };

        let expires = snapshot
            .publication_date
            .date()
            .checked_add_days(Days::new(day.offset_days() as u64))
            .map(|d| d.and_time(NaiveTime::MIN));
        let image_url = endpoints.image_url(snapshot.id.as_str(), day.italian_token());

        let mut slot = CriticalityDay {
            info: alert.info,
            alert: alert.alert,
            level: alert.level,
            image_url: Some(image_url.clone()),
            expires,
            zone_name: props.zone_name.clone(),
            risks: Default::default(),
        };
        for (risk, combined) in &props.risks {
            let Some(parsed) = catalog::parse_alert_string(combined) else {
                log::warn!(
                    "criticality risk {} without alert string for {}",
                    risk.token(),
                    document.url
                );
                continue;
            };
            slot.risks.insert(
                *risk,
                RiskAssessment {
                    risk: risk.label().to_string(),
                    info: parsed.info,
                    alert: parsed.alert,
                    level: parsed.level,
                    icon: Some(catalog::criticality_icon(*risk).to_string()),
                    image_url: Some(image_url.clone()),
                    expires,
                    zone_name: props.zone_name.clone(),
                },
            );
        }

        snapshot.zone_name = props.display_name().to_string();
        snapshot.days.insert(day, slot);
        self.mark_merged(&document.url);
    }
}

impl FeedCache<VigilanceDay> {
    /// Merge one fetched vigilance document (zones or phenomena) into its
    /// day slot.
    pub fn merge_document(
        &mut self,
        document: &FetchedDocument,
        resolver: &ZoneResolver,
        endpoints: &FeedEndpoints,
    ) {
        let Some(scheduled) = self.scheduled_for(&document.url) else {
            log::warn!("vigilance document for unscheduled url {}", document.url);
            return;
        };
        let day = scheduled.day;

        match scheduled.document {
            DocumentKind::Phenomena => {
                let phenomena = resolver.phenomena_within_radius(&document.collection);
                if let Some(snapshot) = self.snapshot.as_mut() {
                    snapshot.days.entry(day).or_default().phenomena = phenomena;
                }
            }
            DocumentKind::Zones => {
                let Some(props) = resolver.resolve(&document.collection) else {
                    log::warn!("vigilance zone unresolved for {}", document.url);
                    return;
                };
                let Some(snapshot) = self.snapshot.as_mut() else {
                    return;
                };

                // The upstream publishes no preview image for the last day.
                let image_url = match day {
                    DaySlot::AfterTomorrow => None,
                    _ => Some(endpoints.image_url(snapshot.id.as_str(), day.italian_token())),
                };
                let expires = snapshot
                    .publication_date
                    .date()
                    .checked_add_days(Days::new(day.offset_days() as u64))
                    .map(|d| d.and_time(NaiveTime::MIN));

                snapshot.zone_name = props.display_name().to_string();
                let slot = snapshot.days.entry(day).or_default();
                slot.level = props.classification;
                slot.icon = catalog::vigilance_icon(props.classification).map(str::to_string);
                slot.image_url = image_url;
                slot.precipitation = props.precipitation.clone();
                slot.expires = expires;
                slot.zone_name = props.zone_name.clone();
            }
        }
        self.mark_merged(&document.url);
    }
}
