// src/services/resolver.rs

//! Bulletin identifier resolver.
//!
//! Discovers the latest published identifier for a feed, trying the
//! structured directory listing first and falling back to scraping the
//! human bulletin landing page. "Not found" is an expected result, never an
//! error: the caller keeps its previous snapshot.

use chrono::{Days, NaiveDate};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{BulletinId, BulletinKind, FeedEndpoints};

/// One entry of the contents-API directory listing.
#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
}

/// Resolves the current bulletin identifier for each feed.
pub struct BulletinResolver<'a> {
    client: &'a Client,
}

impl<'a> BulletinResolver<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Latest published identifier for a feed, or `None` when nothing
    /// resolvable was found anywhere.
    pub async fn latest_id(
        &self,
        kind: BulletinKind,
        endpoints: &FeedEndpoints,
        today: NaiveDate,
    ) -> Option<BulletinId> {
        match self.fetch_text(&endpoints.listing_url).await {
            Ok(body) => {
                if let Some(id) = id_from_listing(&body, kind, today) {
                    log::debug!("{kind} id {id} from directory listing");
                    return Some(id);
                }
                log::debug!("{kind} listing had no entry for today or yesterday");
            }
            Err(e) => log::warn!("{kind} listing unavailable: {e}"),
        }

        match self.fetch_text(&endpoints.bulletin_url).await {
            Ok(html) => {
                let id = id_from_page(&html, kind);
                match &id {
                    Some(id) => log::debug!("{kind} id {id} from bulletin page"),
                    None => log::warn!("{kind} bulletin page had no recognizable id"),
                }
                id
            }
            Err(e) => {
                log::warn!("{kind} bulletin page unavailable: {e}");
                None
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::from_reqwest(url, e))?;
        response
            .text()
            .await
            .map_err(|e| AppError::from_reqwest(url, e))
    }
}

/// The identifier pattern embedded in file names and download links.
fn id_pattern(kind: BulletinKind) -> &'static str {
    match kind {
        BulletinKind::Criticality => r"[0-9]{8}_[0-9]{4}",
        BulletinKind::Vigilance => r"[0-9]{8}",
    }
}

/// Scan a directory listing for the most recent entry dated today, falling
/// back to yesterday (publications can lag past midnight).
fn id_from_listing(body: &str, kind: BulletinKind, today: NaiveDate) -> Option<BulletinId> {
    let entries: Vec<ListingEntry> = serde_json::from_str(body).ok()?;
    let id_re = Regex::new(&format!("^({})\\.json$", id_pattern(kind))).ok()?;

    let stamp_today = today.format("%Y%m%d").to_string();
    let stamp_yesterday = today
        .checked_sub_days(Days::new(1))
        .map(|d| d.format("%Y%m%d").to_string());

    for stamp in std::iter::once(stamp_today).chain(stamp_yesterday) {
        // Listings are oldest-first; the newest matching entry wins.
        for entry in entries.iter().rev() {
            if !entry.name.starts_with(&stamp) {
                continue;
            }
            if let Some(captures) = id_re.captures(&entry.name) {
                return Some(BulletinId(captures[1].to_string()));
            }
        }
    }
    None
}

/// Scrape the bulletin landing page for a download link carrying the id.
///
/// Anchor hrefs are checked first; a plain pattern match over the whole
/// page is the last resort for markup changes.
fn id_from_page(html: &str, kind: BulletinKind) -> Option<BulletinId> {
    let pattern = match kind {
        BulletinKind::Criticality => Regex::new(id_pattern(kind)).ok()?,
        // Vigilance pages carry bare dates everywhere; only the .json
        // download links (plain or with a day suffix) identify a publication.
        BulletinKind::Vigilance => Regex::new(r"([0-9]{8})[^/]*\.json").ok()?,
    };

    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").ok()?;
    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(captures) = pattern.captures(href) {
            let id = captures.get(1).unwrap_or_else(|| captures.get(0).unwrap());
            return Some(BulletinId(id.as_str().to_string()));
        }
    }

    pattern.captures(html).map(|captures| {
        let id = captures.get(1).unwrap_or_else(|| captures.get(0).unwrap());
        BulletinId(id.as_str().to_string())
    })
}
