// src/catalog.rs

//! Fixed lookup tables published with the DPC bulletins: alert levels,
//! icons and the phenomena event-type catalog. Labels stay in Italian, the
//! vocabulary of the upstream feeds.

use crate::models::RiskKind;

/// Icon used when an event-type id has no dedicated icon.
pub const DEFAULT_ICON: &str = "mdi:hazard-lights";

/// Parsed halves of a combined `info/ALERT` property string, plus the level
/// derived from the alert label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertInfo {
    pub info: String,
    pub alert: String,
    pub level: u8,
}

/// Split a combined `info/ALERT` string and derive the numeric level.
///
/// Returns `None` when the string has no `/` separator; the caller treats
/// that as a missing property and skips the feature.
pub fn parse_alert_string(value: &str) -> Option<AlertInfo> {
    let (info, alert) = value.split_once('/')?;
    let alert = alert.trim().to_string();
    let level = alert_level(&alert);
    Some(AlertInfo {
        info: info.trim().to_string(),
        alert,
        level,
    })
}

/// Numeric severity for an alert label. Level 0 means "no data", not "safe".
///
/// The feeds occasionally append qualifiers ("ALLERTA GIALLA PER RISCHIO
/// TEMPORALI"), so the lookup matches on the leading canonical label after
/// trimming and uppercasing.
pub fn alert_level(label: &str) -> u8 {
    let normalized = label.trim().to_uppercase();
    if normalized.starts_with("ALLERTA ROSSA") {
        4
    } else if normalized.starts_with("ALLERTA ARANCIONE") {
        3
    } else if normalized.starts_with("ALLERTA GIALLA") {
        2
    } else if normalized.starts_with("NESSUNA ALLERTA") {
        1
    } else {
        0
    }
}

/// Icon for a criticality risk category.
pub fn criticality_icon(risk: RiskKind) -> &'static str {
    match risk {
        RiskKind::Idraulico => "mdi:home-flood",
        RiskKind::Temporali => "mdi:weather-lightning",
        RiskKind::Idrogeologico => "mdi:waves",
    }
}

/// Icon for a vigilance zone classification (1-5).
pub fn vigilance_icon(level: u8) -> Option<&'static str> {
    match level {
        1 => Some("mdi:numeric-1-circle"),
        2 => Some("mdi:numeric-2-circle"),
        3 => Some("mdi:numeric-3-circle"),
        4 => Some("mdi:numeric-4-circle"),
        5 => Some("mdi:numeric-5-circle"),
        _ => None,
    }
}

/// Phenomenon event group and label for an event-type id.
///
/// Groups mirror the upstream catalog; ids outside it return `None` and the
/// feature is skipped.
pub fn phenomenon_event(id: i64) -> Option<(&'static str, &'static str)> {
    let entry = match id {
        1 => ("Precipitazioni", "piogge sparse o intermittenti"),
        2 => ("Precipitazioni", "piogge diffuse e continue"),
        3 => ("Precipitazioni", "nevicate deboli o moderate"),
        4 => ("Precipitazioni", "nevicate abbondanti"),
        5 => ("Precipitazioni", "rovesci o temporali a carattere isolato"),
        6 => ("Precipitazioni", "rovesci o temporali a carattere sparso"),
        7 => ("Precipitazioni", "rovesci o temporali a carattere diffuso"),
        10 => ("Venti", "forti"),
        11 => ("Venti", "burrasca"),
        12 => ("Venti", "tempesta"),
        13 => ("Venti", "frequenti raffiche"),
        20 => (
            "Gelate",
            "diffusa formazione di ghiaccio al suolo a quote collinari",
        ),
        21 => (
            "Gelate",
            "diffusa formazione di ghiaccio al suolo a quote di pianura",
        ),
        30 => ("Nebbie", "diffuse nelle ore notturne e del primo mattino"),
        31 => ("Nebbie", "diffuse e persistenti anche nelle ore diurne"),
        40 => ("Mari", "molto mosso"),
        41 => ("Mari", "agitato o molto agitato"),
        42 => ("Mari", "grosso o molto grosso"),
        50 => ("Moto ondoso", "in aumento"),
        51 => ("Moto ondoso", "in diminuzione"),
        60 => ("Temperature", "elevate o in sensibile aumento"),
        61 => ("Temperature", "molto elevate o in marcato aumento"),
        62 => ("Temperature", "basse o in sensibile calo"),
        63 => ("Temperature", "molto basse o in marcato calo"),
        _ => return None,
    };
    Some(entry)
}

/// Icon for a phenomenon event-type id, with a generic fallback.
pub fn phenomenon_icon(id: i64) -> &'static str {
    match id {
        1 => "mdi:water",
        2 => "mdi:water-plus",
        3 => "mdi:snowflake",
        4 => "mdi:snowflake-alert",
        5 => "mdi:lightning-bolt",
        6 => "mdi:flash",
        7 => "mdi:flash-alert",
        10 => "mdi:weather-windy-variant",
        11 => "mdi:weather-windy",
        12 => "mdi:windsock",
        13 => "mdi:wind-turbine",
        20 => "mdi:image-filter-hdr",
        21 => "mdi:snowflake-variant",
        30 => "mdi:weather-fog",
        31 => "mdi:weather-hazy",
        40 => "mdi:wave",
        41 => "mdi:waves",
        42 => "mdi:hydro-power",
        50 => "mdi:arrow-up-thick",
        51 => "mdi:arrow-down-thick",
        60 => "mdi:thermometer-chevron-up",
        61 => "mdi:thermometer-plus",
        62 => "mdi:thermometer-chevron-down",
        63 => "mdi:thermometer-minus",
        _ => DEFAULT_ICON,
    }
}
