//! End-to-end refresh scenarios over canned GeoJSON, no network involved.
//!
//! Drives the per-feed cache through the same plan / merge / rollover steps
//! the orchestrator performs and checks the resulting day slots.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use dpc_alert::engine::{FeedCache, RefreshPlan};
use dpc_alert::models::{
    BulletinId, BulletinKind, CriticalityDay, DaySlot, Endpoints, FeatureCollection, GeoPoint,
    VigilanceDay,
};
use dpc_alert::services::{FetchedDocument, ZoneResolver};

const POLL: Duration = Duration::from_secs(1800);

fn at(y: i32, m: u32, d: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn rome_resolver() -> ZoneResolver {
    ZoneResolver::new(GeoPoint::new(41.9, 12.5), Some("Roma".into()), 50.0)
}

/// A zone document with one polygon around Rome.
fn zone_doc(level: u8) -> FeatureCollection {
    serde_json::from_str(&format!(
        r#"{{
        "features": [{{
            "geometry": {{"type": "Polygon",
                "coordinates": [[[12,41],[12,43],[13,43],[13,41],[12,41]]]}},
            "properties": {{
                "Nome_Zona": "Roma Area",
                "comuni": ["Roma"],
                "id_classificazione": {level},
                "Quantitativi_previsti": "assenti"
            }}
        }}]
    }}"#
    ))
    .unwrap()
}

/// A phenomena document with one wind event near Rome and one far away.
fn phenomena_doc() -> FeatureCollection {
    serde_json::from_str(
        r#"{
        "features": [
            {
                "geometry": {"type": "Point", "coordinates": [12.6, 41.95]},
                "properties": {
                    "id_fenomeno": 11,
                    "id_bollettino": 555,
                    "data_bollettino": "2024-01-15",
                    "lat": 41.95, "lon": 12.6
                }
            },
            {
                "geometry": {"type": "Point", "coordinates": [9.19, 45.46]},
                "properties": {
                    "id_fenomeno": 40,
                    "id_bollettino": 555,
                    "data_bollettino": "2024-01-15",
                    "lat": 45.46, "lon": 9.19
                }
            }
        ]
    }"#,
    )
    .unwrap()
}

fn merge(
    cache: &mut FeedCache<VigilanceDay>,
    url: String,
    collection: FeatureCollection,
    endpoints: &Endpoints,
) {
    cache.merge_document(
        &FetchedDocument { url, collection },
        &rome_resolver(),
        &endpoints.vigilance,
    );
}

#[test]
fn vigilance_full_cycle_populates_three_days() {
    let endpoints = Endpoints::default();
    let resolver_endpoints = &endpoints.vigilance;
    let mut cache: FeedCache<VigilanceDay> = FeedCache::new(BulletinKind::Vigilance);

    let plan = cache
        .plan_refresh(
            Some(&BulletinId("20240115".into())),
            resolver_endpoints,
            at(2024, 1, 15, 9, 0),
            POLL,
        )
        .unwrap();
    assert_eq!(
        plan,
        RefreshPlan::NewPublication {
            swap_after_merge: false
        }
    );

    for token in ["oggi", "domani", "dopodomani"] {
        let level = if token == "oggi" { 3 } else { 2 };
        merge(
            &mut cache,
            resolver_endpoints.geojson_url("20240115", token),
            zone_doc(level),
            &endpoints,
        );
        merge(
            &mut cache,
            resolver_endpoints.geojson_url("20240115", &format!("fenomeni_{token}")),
            phenomena_doc(),
            &endpoints,
        );
    }

    assert!(!cache.requires_full_refresh());
    let snapshot = cache.snapshot().unwrap();
    assert_eq!(snapshot.id.as_str(), "20240115");
    assert_eq!(snapshot.zone_name, "Roma Area");
    assert_eq!(snapshot.days.len(), 3);

    let today = snapshot.days.get(&DaySlot::Today).unwrap();
    assert_eq!(today.level, 3);
    assert_eq!(today.icon.as_deref(), Some("mdi:numeric-3-circle"));
    assert_eq!(today.phenomena.len(), 1);
    assert_eq!(today.phenomena[0].event, "Venti");
    assert_eq!(today.phenomena[0].id, "555");

    // No preview image is published for the last day.
    let after = snapshot.days.get(&DaySlot::AfterTomorrow).unwrap();
    assert!(after.image_url.is_none());
    assert!(
        snapshot
            .days
            .get(&DaySlot::Tomorrow)
            .unwrap()
            .image_url
            .as_deref()
            .unwrap()
            .ends_with("20240115_domani.png")
    );
}

#[test]
fn partial_failure_merges_what_arrived_and_stays_pending() {
    let endpoints = Endpoints::default();
    let feed = &endpoints.vigilance;
    let mut cache: FeedCache<VigilanceDay> = FeedCache::new(BulletinKind::Vigilance);
    cache
        .plan_refresh(
            Some(&BulletinId("20240115".into())),
            feed,
            at(2024, 1, 15, 9, 0),
            POLL,
        )
        .unwrap();
    assert_eq!(cache.pending_urls().len(), 6);

    // Only two of six scheduled documents came back.
    merge(
        &mut cache,
        feed.geojson_url("20240115", "oggi"),
        zone_doc(4),
        &endpoints,
    );
    merge(
        &mut cache,
        feed.geojson_url("20240115", "fenomeni_oggi"),
        phenomena_doc(),
        &endpoints,
    );

    let snapshot = cache.snapshot().unwrap();
    assert_eq!(snapshot.days.len(), 1);
    assert_eq!(snapshot.days.get(&DaySlot::Today).unwrap().level, 4);
    assert_eq!(cache.pending_urls().len(), 4);
    assert!(cache.requires_full_refresh());
}

#[test]
fn repeated_refresh_same_id_outside_window_is_idempotent() {
    let endpoints = Endpoints::default();
    let feed = &endpoints.vigilance;
    let id = BulletinId("20240115".into());
    let mut cache: FeedCache<VigilanceDay> = FeedCache::new(BulletinKind::Vigilance);
    cache
        .plan_refresh(Some(&id), feed, at(2024, 1, 15, 9, 0), POLL)
        .unwrap();
    for token in ["oggi", "domani", "dopodomani"] {
        merge(
            &mut cache,
            feed.geojson_url("20240115", token),
            zone_doc(2),
            &endpoints,
        );
        merge(
            &mut cache,
            feed.geojson_url("20240115", &format!("fenomeni_{token}")),
            phenomena_doc(),
            &endpoints,
        );
    }
    let before = cache.snapshot().cloned().unwrap();

    let plan = cache
        .plan_refresh(Some(&id), feed, at(2024, 1, 15, 9, 30), POLL)
        .unwrap();
    assert_eq!(plan, RefreshPlan::Unchanged);
    let after = cache.snapshot().cloned().unwrap();
    assert_eq!(before.days, after.days);
    assert_eq!(before.id, after.id);
}

#[test]
fn midnight_window_rolls_over_then_holds() {
    let endpoints = Endpoints::default();
    let feed = &endpoints.vigilance;
    let id = BulletinId("20240115".into());
    let mut cache: FeedCache<VigilanceDay> = FeedCache::new(BulletinKind::Vigilance);
    cache
        .plan_refresh(Some(&id), feed, at(2024, 1, 15, 9, 0), POLL)
        .unwrap();
    for (token, level) in [("oggi", 1), ("domani", 2), ("dopodomani", 3)] {
        merge(
            &mut cache,
            feed.geojson_url("20240115", token),
            zone_doc(level),
            &endpoints,
        );
        merge(
            &mut cache,
            feed.geojson_url("20240115", &format!("fenomeni_{token}")),
            phenomena_doc(),
            &endpoints,
        );
    }

    // First poll after midnight with the same publication id.
    let plan = cache
        .plan_refresh(Some(&id), feed, at(2024, 1, 16, 0, 5), POLL)
        .unwrap();
    assert_eq!(plan, RefreshPlan::RolledOver);

    let days = &cache.snapshot().unwrap().days;
    assert_eq!(days.len(), 2);
    assert_eq!(days.get(&DaySlot::Today).unwrap().level, 2);
    assert_eq!(days.get(&DaySlot::Tomorrow).unwrap().level, 3);
    assert!(!days.contains_key(&DaySlot::AfterTomorrow));

    // Second poll inside the same window: no duplicate shift.
    let plan = cache
        .plan_refresh(Some(&id), feed, at(2024, 1, 16, 0, 20), POLL)
        .unwrap();
    assert_eq!(plan, RefreshPlan::Unchanged);
    assert_eq!(cache.snapshot().unwrap().days.len(), 2);
}

#[test]
fn yesterdays_publication_lands_in_shifted_slots() {
    let endpoints = Endpoints::default();
    let feed = &endpoints.vigilance;
    let mut cache: FeedCache<VigilanceDay> = FeedCache::new(BulletinKind::Vigilance);

    // Poll on the 16th discovers a bulletin still dated the 15th: its
    // "oggi" is stale and skipped, the forward days are fetched and then
    // shifted so that its "domani" becomes today's data.
    let plan = cache
        .plan_refresh(
            Some(&BulletinId("20240115".into())),
            feed,
            at(2024, 1, 16, 8, 0),
            POLL,
        )
        .unwrap();
    assert_eq!(
        plan,
        RefreshPlan::NewPublication {
            swap_after_merge: true
        }
    );
    assert_eq!(cache.pending_urls().len(), 4);

    for (token, level) in [("domani", 3), ("dopodomani", 2)] {
        merge(
            &mut cache,
            feed.geojson_url("20240115", token),
            zone_doc(level),
            &endpoints,
        );
        merge(
            &mut cache,
            feed.geojson_url("20240115", &format!("fenomeni_{token}")),
            phenomena_doc(),
            &endpoints,
        );
    }
    assert!(cache.rollover(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()));

    let days = &cache.snapshot().unwrap().days;
    assert_eq!(days.len(), 2);
    assert_eq!(days.get(&DaySlot::Today).unwrap().level, 3);
    assert_eq!(days.get(&DaySlot::Tomorrow).unwrap().level, 2);
    assert!(!cache.requires_full_refresh());
}

#[test]
fn criticality_cycle_with_municipality_resolution() {
    let endpoints = Endpoints::default();
    let feed = &endpoints.criticality;
    let mut cache: FeedCache<CriticalityDay> = FeedCache::new(BulletinKind::Criticality);
    cache
        .plan_refresh(
            Some(&BulletinId("20240115_1500".into())),
            feed,
            at(2024, 1, 15, 16, 0),
            POLL,
        )
        .unwrap();

    let doc: FeatureCollection = serde_json::from_str(
        r#"{
        "features": [
            {
                "geometry": {"type": "Polygon",
                    "coordinates": [[[12,41],[12,43],[13,43],[13,41],[12,41]]]},
                "properties": {
                    "Nome zona": "Zona contenente",
                    "Comuni": ["Roma"],
                    "Rappresentata nella mappa": "ordinaria criticita' / ALLERTA GIALLA",
                    "Per rischio idraulico": "assente / NESSUNA ALLERTA",
                    "Per rischio temporali": "ordinaria / ALLERTA GIALLA",
                    "Per rischio idrogeologico": "assente / NESSUNA ALLERTA"
                }
            },
            {
                "geometry": {"type": "Polygon",
                    "coordinates": [[[20,40],[20,42],[22,42],[22,40],[20,40]]]},
                "properties": {
                    "Nome zona": "Zona severa",
                    "Comuni": ["Roma"],
                    "Rappresentata nella mappa": "moderata criticita' / ALLERTA ARANCIONE",
                    "Per rischio idraulico": "moderata / ALLERTA ARANCIONE",
                    "Per rischio temporali": "moderata / ALLERTA ARANCIONE",
                    "Per rischio idrogeologico": "ordinaria / ALLERTA GIALLA"
                }
            }
        ]
    }"#,
    )
    .unwrap();

    for token in ["today", "tomorrow"] {
        cache.merge_document(
            &FetchedDocument {
                url: feed.geojson_url("20240115_1500", token),
                collection: doc.clone(),
            },
            &rome_resolver(),
            feed,
        );
    }

    let snapshot = cache.snapshot().unwrap();
    // Severity picks the worse zone; the containing polygon names the zone.
    assert_eq!(snapshot.zone_name, "Zona contenente");
    let today = snapshot.days.get(&DaySlot::Today).unwrap();
    assert_eq!(today.zone_name, "Zona severa");
    assert_eq!(today.level, 3);
    assert_eq!(today.max_level(), 3);
    assert!(!cache.requires_full_refresh());
}
