// src/services/zones.rs

//! Zone resolution service.
//!
//! Maps the configured location (and optional municipality name) onto the
//! forecast-zone features of a bulletin document. The two feeds disagree on
//! property-key casing (`Nome zona`/`Nome_Zona`, `Comuni`/`comuni`); every
//! irregularity is normalized here and nowhere else.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::catalog;
use crate::geometry::{distance_meters, geometry_within_radius, initial_bearing, point_in_polygon};
use crate::models::{Feature, FeatureCollection, GeoPoint, Phenomenon, RiskKind};

/// Normalized subset of a zone feature's properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneProperties {
    /// Zone name from the feature itself.
    pub zone_name: String,
    /// Zone name of the polygon actually containing the point, when a
    /// municipality match spanned several zones.
    pub display_zone_name: Option<String>,
    /// Severity classification: `id_classificazione` (vigilance) or the
    /// level derived from the combined alert string (criticality).
    pub classification: u8,
    /// Combined `info/ALERT` string of the criticality map representation.
    pub map_representation: Option<String>,
    /// Per-risk combined `info/ALERT` strings (criticality only).
    pub risks: BTreeMap<RiskKind, String>,
    /// Forecast precipitation quantity (vigilance only).
    pub precipitation: Option<String>,
}

impl ZoneProperties {
    /// The zone name to display: the containing polygon wins over the
    /// severity-selected zone. Deliberate safety-biased policy carried over
    /// from the upstream source.
    pub fn display_name(&self) -> &str {
        self.display_zone_name.as_deref().unwrap_or(&self.zone_name)
    }

    fn from_properties(props: &Map<String, Value>) -> Option<Self> {
        let zone_name = get_str(props, &["Nome zona", "Nome_Zona"])?.to_string();

        let map_representation =
            get_str(props, &["Rappresentata nella mappa"]).map(str::to_string);

        let classification = match get_u64(props, &["id_classificazione"]) {
            Some(id) => id.min(u8::MAX as u64) as u8,
            None => map_representation
                .as_deref()
                .and_then(catalog::parse_alert_string)
                .map(|a| a.level)
                .unwrap_or(0),
        };

        let mut risks = BTreeMap::new();
        for risk in RiskKind::ALL {
            let key = format!("Per rischio {}", risk.token());
            if let Some(value) = get_str(props, &[&key]) {
                risks.insert(risk, value.to_string());
            }
        }

        Some(Self {
            zone_name,
            display_zone_name: None,
            classification,
            map_representation,
            risks,
            precipitation: get_str(props, &["Quantitativi_previsti"]).map(str::to_string),
        })
    }
}

/// Resolves zones and phenomena for one configured location.
pub struct ZoneResolver {
    point: GeoPoint,
    municipality: Option<String>,
    radius_m: f64,
}

impl ZoneResolver {
    pub fn new(point: GeoPoint, municipality: Option<String>, radius_km: f64) -> Self {
        // Empty municipality strings come in from blank config fields.
        let municipality = municipality.filter(|m| !m.trim().is_empty());
        Self {
            point,
            municipality,
            radius_m: radius_km * 1000.0,
        }
    }

    /// Resolve the zone for this location, preferring the municipality
    /// match when one is configured.
    pub fn resolve(&self, collection: &FeatureCollection) -> Option<ZoneProperties> {
        match &self.municipality {
            Some(name) => self.resolve_by_municipality(name, collection),
            None => self.resolve_by_point(collection),
        }
    }

    /// First feature whose geometry contains the point. No nearest-feature
    /// fallback at this level; absence is a valid result.
    pub fn resolve_by_point(&self, collection: &FeatureCollection) -> Option<ZoneProperties> {
        for feature in &collection.features {
            if !self.contains_point(feature) {
                continue;
            }
            match ZoneProperties::from_properties(&feature.properties) {
                Some(props) => return Some(props),
                None => {
                    log::warn!("zone feature without a zone name, skipping");
                }
            }
        }
        log::debug!(
            "no zone polygon contains ({}, {})",
            self.point.latitude,
            self.point.longitude
        );
        None
    }

    /// Features whose municipality list contains `name`, case-insensitive.
    ///
    /// A municipality straddling several zones takes the highest severity
    /// classification (first-encountered wins ties), while the polygon that
    /// contains the point supplies the displayed zone name. Falls back to
    /// the plain point lookup when nothing matches.
    pub fn resolve_by_municipality(
        &self,
        name: &str,
        collection: &FeatureCollection,
    ) -> Option<ZoneProperties> {
        let needle = name.trim().to_lowercase();
        let mut matches: Vec<ZoneProperties> = Vec::new();
        let mut containing_zone: Option<String> = None;

        for feature in &collection.features {
            if !municipalities(&feature.properties)
                .iter()
                .any(|city| city.to_lowercase() == needle)
            {
                continue;
            }
            let Some(props) = ZoneProperties::from_properties(&feature.properties) else {
                log::warn!("zone feature without a zone name, skipping");
                continue;
            };
            if self.contains_point(feature) {
                containing_zone = Some(props.zone_name.clone());
            }
            matches.push(props);
        }

        if matches.is_empty() {
            log::debug!("municipality {name:?} not found in any zone, using point lookup");
            return self.resolve_by_point(collection);
        }

        let mut best = matches
            .into_iter()
            .reduce(|best, candidate| {
                if candidate.classification > best.classification {
                    candidate
                } else {
                    best
                }
            })
            .expect("matches is non-empty");
        best.display_zone_name = containing_zone;
        Some(best)
    }

    /// One phenomenon per recognized event within the configured radius,
    /// with distance and bearing computed from the location.
    pub fn phenomena_within_radius(&self, collection: &FeatureCollection) -> Vec<Phenomenon> {
        let mut phenomena = Vec::new();
        for feature in &collection.features {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            match geometry_within_radius(geometry, &self.point, self.radius_m) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    log::warn!("phenomenon feature with bad geometry, skipping: {e}");
                    continue;
                }
            }
            if let Some(phenomenon) = self.phenomenon_from(&feature.properties) {
                phenomena.push(phenomenon);
            }
        }
        phenomena
    }

    fn phenomenon_from(&self, props: &Map<String, Value>) -> Option<Phenomenon> {
        let event_type_id = get_u64(props, &["id_fenomeno"])? as i64;
        let (event, value) = catalog::phenomenon_event(event_type_id)?;
        let latitude = get_f64(props, &["lat"])?;
        let longitude = get_f64(props, &["lon"])?;

        let target = GeoPoint::new(latitude, longitude);
        let (direction, degrees) = initial_bearing(&self.point, &target);
        let distance_km = (distance_meters(&self.point, &target) / 100.0).round() / 10.0;

        Some(Phenomenon {
            id: get_any_string(props, &["id_bollettino"]).unwrap_or_default(),
            date: get_any_string(props, &["data_bollettino"]).unwrap_or_default(),
            event_type_id,
            event: event.to_string(),
            value: value.to_string(),
            latitude,
            longitude,
            distance_km,
            direction: direction.to_string(),
            degrees,
            icon: catalog::phenomenon_icon(event_type_id).to_string(),
        })
    }

    fn contains_point(&self, feature: &Feature) -> bool {
        let Some(geometry) = &feature.geometry else {
            return false;
        };
        match point_in_polygon(&self.point, geometry) {
            Ok(contained) => contained,
            Err(e) => {
                log::warn!("zone feature with bad geometry, skipping: {e}");
                false
            }
        }
    }
}

fn municipalities(props: &Map<String, Value>) -> Vec<String> {
    for key in ["Comuni", "comuni"] {
        if let Some(Value::Array(list)) = props.get(key) {
            return list
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
    }
    Vec::new()
}

fn get_str<'a>(props: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| props.get(*k).and_then(Value::as_str))
}

fn get_u64(props: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| props.get(*k).and_then(Value::as_u64))
}

fn get_f64(props: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| props.get(*k).and_then(Value::as_f64))
}

/// Stringify a property that upstream emits sometimes as number, sometimes
/// as string.
fn get_any_string(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match props.get(*k) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
