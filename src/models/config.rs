// src/models/config.rs

//! Engine configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::GeoPoint;

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Monitored location
    pub location: LocationConfig,

    /// HTTP and polling behavior
    #[serde(default)]
    pub polling: PollingConfig,

    /// Upstream feed endpoints
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.location.name.trim().is_empty() {
            return Err(AppError::config("location.name is empty"));
        }
        if !(-90.0..=90.0).contains(&self.location.latitude) {
            return Err(AppError::config("location.latitude out of range"));
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            return Err(AppError::config("location.longitude out of range"));
        }
        if self.location.radius_km <= 0.0 {
            return Err(AppError::config("location.radius_km must be > 0"));
        }
        if self.polling.interval_minutes == 0 {
            return Err(AppError::config("polling.interval_minutes must be > 0"));
        }
        if self.polling.timeout_secs == 0 {
            return Err(AppError::config("polling.timeout_secs must be > 0"));
        }
        if self.polling.user_agent.trim().is_empty() {
            return Err(AppError::config("polling.user_agent is empty"));
        }
        for feed in [&self.endpoints.criticality, &self.endpoints.vigilance] {
            Url::parse(&feed.listing_url)?;
            Url::parse(&feed.bulletin_url)?;
            if !feed.geojson_template.contains("{id}") || !feed.geojson_template.contains("{day}")
            {
                return Err(AppError::config(
                    "geojson_template must contain {id} and {day}",
                ));
            }
        }
        Ok(())
    }
}

/// The monitored geographic location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Display name for the location
    pub name: String,

    pub latitude: f64,
    pub longitude: f64,

    /// Optional municipality name override for zone matching
    #[serde(default)]
    pub municipality: Option<String>,

    /// Phenomena search radius in kilometers
    #[serde(default = "defaults::radius_km")]
    pub radius_km: f64,

    /// Minimum alert level of interest for the host (0-4)
    #[serde(default = "defaults::warning_level")]
    pub warning_level: u8,
}

impl LocationConfig {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// HTTP client and polling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Poll interval in minutes, also bounds the post-midnight rollover window
    #[serde(default = "defaults::interval_minutes")]
    pub interval_minutes: u64,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Out-of-band retry delay hinted to the host on partial refreshes
    #[serde(default = "defaults::retry_after")]
    pub retry_after_secs: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_minutes: defaults::interval_minutes(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
            retry_after_secs: defaults::retry_after(),
        }
    }
}

/// Upstream endpoints for both feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "defaults::criticality_endpoints")]
    pub criticality: FeedEndpoints,

    #[serde(default = "defaults::vigilance_endpoints")]
    pub vigilance: FeedEndpoints,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            criticality: defaults::criticality_endpoints(),
            vigilance: defaults::vigilance_endpoints(),
        }
    }
}

/// Endpoint set for a single feed.
///
/// The engine never hardcodes hostnames; it only needs "given a bulletin id
/// and a day token, produce a URL", so the templates are injected here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEndpoints {
    /// Structured directory listing (contents-API JSON array)
    pub listing_url: String,

    /// Human bulletin landing page, scraped as a fallback
    pub bulletin_url: String,

    /// Per-day GeoJSON template with `{id}` and `{day}` placeholders
    pub geojson_template: String,

    /// Preview image template with `{id}` and `{day}` placeholders
    pub image_template: String,
}

impl FeedEndpoints {
    /// Expand the GeoJSON document URL for a bulletin id and day token.
    pub fn geojson_url(&self, id: &str, day_token: &str) -> String {
        self.geojson_template
            .replace("{id}", id)
            .replace("{day}", day_token)
    }

    /// Expand the preview image URL for a bulletin id and day token.
    pub fn image_url(&self, id: &str, day_token: &str) -> String {
        self.image_template
            .replace("{id}", id)
            .replace("{day}", day_token)
    }
}

mod defaults {
    use super::FeedEndpoints;

    pub fn radius_km() -> f64 {
        50.0
    }
    pub fn warning_level() -> u8 {
        2
    }
    pub fn interval_minutes() -> u64 {
        30
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn retry_after() -> u64 {
        600
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; dpc-alert/0.1)".into()
    }

    pub fn criticality_endpoints() -> FeedEndpoints {
        FeedEndpoints {
            listing_url: "https://api.github.com/repos/pcm-dpc/DPC-Bollettini-Criticita-Idrogeologica-Idraulica/contents/files".into(),
            bulletin_url: "https://mappe.protezionecivile.gov.it/it/mappe-rischi/bollettino-di-criticita/".into(),
            geojson_template: "https://raw.githubusercontent.com/pcm-dpc/DPC-Bollettini-Criticita-Idrogeologica-Idraulica/master/files/geojson/{id}_{day}.json".into(),
            image_template: "https://raw.githubusercontent.com/pcm-dpc/DPC-Bollettini-Criticita-Idrogeologica-Idraulica/master/files/preview/{id}_{day}.png".into(),
        }
    }

    pub fn vigilance_endpoints() -> FeedEndpoints {
        FeedEndpoints {
            listing_url: "https://api.github.com/repos/pcm-dpc/DPC-Bollettini-Vigilanza-Meteorologica/contents/files".into(),
            bulletin_url: "https://mappe.protezionecivile.gov.it/it/mappe-rischi/bollettino-di-vigilanza/".into(),
            geojson_template: "https://raw.githubusercontent.com/pcm-dpc/DPC-Bollettini-Vigilanza-Meteorologica/master/files/geojson/{id}_{day}.json".into(),
            image_template: "https://raw.githubusercontent.com/pcm-dpc/DPC-Bollettini-Vigilanza-Meteorologica/master/files/preview/{id}_{day}.png".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_config() -> EngineConfig {
        EngineConfig {
            location: LocationConfig {
                name: "Roma".into(),
                latitude: 41.9,
                longitude: 12.5,
                municipality: Some("Roma".into()),
                radius_km: defaults::radius_km(),
                warning_level: defaults::warning_level(),
            },
            polling: PollingConfig::default(),
            endpoints: Endpoints::default(),
        }
    }

    #[test]
    fn validate_sample_config_ok() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_latitude() {
        let mut config = sample_config();
        config.location.latitude = 91.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_template_without_placeholders() {
        let mut config = sample_config();
        config.endpoints.vigilance.geojson_template = "https://example.com/fixed.json".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unparseable_endpoint_url() {
        let mut config = sample_config();
        config.endpoints.criticality.listing_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn template_expansion() {
        let endpoints = defaults::vigilance_endpoints();
        let url = endpoints.geojson_url("20240115", "oggi");
        assert!(url.ends_with("/20240115_oggi.json"));
        let image = endpoints.image_url("20240115", "domani");
        assert!(image.ends_with("/20240115_domani.png"));
    }

    #[test]
    fn load_from_toml_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[location]\nname = \"Roma\"\nlatitude = 41.9\nlongitude = 12.5\n"
        )
        .unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.location.radius_km, 50.0);
        assert_eq!(config.polling.interval_minutes, 30);
        assert!(config.endpoints.criticality.listing_url.contains("Criticita"));
        assert!(config.validate().is_ok());
    }
}
