// src/models/bulletin.rs

//! Bulletin domain types: feeds, identifiers, day slots and snapshots.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// The two independently published bulletin feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulletinKind {
    /// Hydro-geological/hydraulic risk bulletin, today/tomorrow only.
    Criticality,
    /// General weather bulletin, three days plus discrete phenomena.
    Vigilance,
}

impl fmt::Display for BulletinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulletinKind::Criticality => write!(f, "criticality"),
            BulletinKind::Vigilance => write!(f, "vigilance"),
        }
    }
}

/// Opaque bulletin publication identifier.
///
/// `YYYYMMDD_HHMM` for criticality, `YYYYMMDD` for vigilance. Two ids
/// compare only by equality; change detection needs nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletinId(pub String);

impl BulletinId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the publication timestamp embedded in the identifier.
    pub fn publication_date(&self, kind: BulletinKind) -> Result<NaiveDateTime> {
        match kind {
            BulletinKind::Criticality => {
                NaiveDateTime::parse_from_str(&self.0, "%Y%m%d_%H%M")
                    .map_err(|e| AppError::parse(format!("bulletin id {}: {}", self.0, e)))
            }
            BulletinKind::Vigilance => NaiveDate::parse_from_str(&self.0, "%Y%m%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
                .map_err(|e| AppError::parse(format!("bulletin id {}: {}", self.0, e))),
        }
    }
}

impl fmt::Display for BulletinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of forecast day slots.
///
/// Upstream documents key days by inconsistent tokens (English for
/// criticality GeoJSON, Italian everywhere else); the mapping lives here so
/// nothing downstream branches on strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DaySlot {
    Today,
    Tomorrow,
    #[serde(rename = "aftertomorrow")]
    AfterTomorrow,
}

impl DaySlot {
    /// Day token used in criticality GeoJSON URLs (English, two days only).
    pub fn criticality_token(self) -> Option<&'static str> {
        match self {
            DaySlot::Today => Some("today"),
            DaySlot::Tomorrow => Some("tomorrow"),
            DaySlot::AfterTomorrow => None,
        }
    }

    /// Day token used in vigilance GeoJSON URLs and all image URLs.
    pub fn italian_token(self) -> &'static str {
        match self {
            DaySlot::Today => "oggi",
            DaySlot::Tomorrow => "domani",
            DaySlot::AfterTomorrow => "dopodomani",
        }
    }

    /// Offset from the publication date in days.
    pub fn offset_days(self) -> i64 {
        match self {
            DaySlot::Today => 0,
            DaySlot::Tomorrow => 1,
            DaySlot::AfterTomorrow => 2,
        }
    }
}

/// Named risk categories of the criticality bulletin.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskKind {
    Idraulico,
    Temporali,
    Idrogeologico,
}

impl RiskKind {
    pub const ALL: [RiskKind; 3] = [
        RiskKind::Idraulico,
        RiskKind::Temporali,
        RiskKind::Idrogeologico,
    ];

    /// Lowercase token, as used in the upstream property keys.
    pub fn token(self) -> &'static str {
        match self {
            RiskKind::Idraulico => "idraulico",
            RiskKind::Temporali => "temporali",
            RiskKind::Idrogeologico => "idrogeologico",
        }
    }

    /// Capitalized display label.
    pub fn label(self) -> &'static str {
        match self {
            RiskKind::Idraulico => "Idraulico",
            RiskKind::Temporali => "Temporali",
            RiskKind::Idrogeologico => "Idrogeologico",
        }
    }
}

/// One criticality day slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalityDay {
    /// Plain-language description, left half of the combined `info/ALERT`.
    pub info: String,
    /// Alert label, right half of the combined string.
    pub alert: String,
    /// Numeric level 0-4 derived from the alert label; 0 means unknown.
    pub level: u8,
    pub image_url: Option<String>,
    pub expires: Option<NaiveDateTime>,
    pub zone_name: String,
    /// Per-risk assessments, shifted together with the day during rollover.
    pub risks: BTreeMap<RiskKind, RiskAssessment>,
}

impl CriticalityDay {
    /// Highest level across the day and its risk categories.
    pub fn max_level(&self) -> u8 {
        self.risks
            .values()
            .map(|r| r.level)
            .chain(std::iter::once(self.level))
            .max()
            .unwrap_or(0)
    }
}

/// Assessment of a single named risk for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk: String,
    pub info: String,
    pub alert: String,
    pub level: u8,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub expires: Option<NaiveDateTime>,
    pub zone_name: String,
}

/// One vigilance day slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VigilanceDay {
    /// Zone classification 1-5; 0 until the zone document merged.
    pub level: u8,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    /// Forecast precipitation quantity, verbatim from the feed.
    pub precipitation: Option<String>,
    pub expires: Option<NaiveDateTime>,
    pub zone_name: String,
    /// Discrete events within the configured radius.
    pub phenomena: Vec<Phenomenon>,
}

/// A discrete forecast event near the configured location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phenomenon {
    pub id: String,
    pub date: String,
    pub event_type_id: i64,
    pub event: String,
    pub value: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_km: f64,
    pub direction: String,
    pub degrees: i32,
    pub icon: String,
}

/// Snapshot of one feed: publication envelope plus day-keyed slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletinSnapshot<D> {
    pub id: BulletinId,
    pub publication_date: NaiveDateTime,
    pub last_update: DateTime<Local>,
    pub zone_name: String,
    pub link: String,
    pub days: BTreeMap<DaySlot, D>,
}

impl<D> BulletinSnapshot<D> {
    pub fn new(id: BulletinId, publication_date: NaiveDateTime, link: String) -> Self {
        Self {
            id,
            publication_date,
            last_update: Local::now(),
            zone_name: String::new(),
            link,
            days: BTreeMap::new(),
        }
    }
}

/// The merged two-feed snapshot handed to the host after every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_update: DateTime<Local>,
    pub criticality: Option<BulletinSnapshot<CriticalityDay>>,
    pub vigilance: Option<BulletinSnapshot<VigilanceDay>>,
    /// True when a slot or scheduled URL is still missing; the host should
    /// retry out of band after `retry_after_secs`.
    pub requires_full_refresh: bool,
    pub retry_after_secs: Option<u64>,
    /// Minimum alert level of interest, from the location configuration.
    pub warning_level: u8,
}

impl Snapshot {
    /// Highest criticality level for a day, across risk categories.
    pub fn criticality_max_level(&self, day: DaySlot) -> u8 {
        self.criticality
            .as_ref()
            .and_then(|b| b.days.get(&day))
            .map(|d| d.max_level())
            .unwrap_or(0)
    }

    /// Whether the day's criticality reaches the configured threshold.
    ///
    /// Derived on read, never stored in the day slots. Level 0 means "no
    /// data" and never trips the flag, whatever the threshold.
    pub fn alert_at_or_above(&self, day: DaySlot) -> bool {
        let level = self.criticality_max_level(day);
        level > 0 && level >= self.warning_level
    }
}
