// src/error.rs

//! Unified error handling for the bulletin engine.

use std::fmt;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Connection / DNS failure
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Request exceeded the configured timeout
    #[error("Timeout fetching {url}")]
    Timeout { url: String },

    /// Upstream returned a non-success status
    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Malformed JSON or HTML payload
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed polygon or point geometry
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// No new bulletin identifier could be resolved for either feed
    #[error("Stale data: no bulletin identifier resolvable")]
    StaleData,

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Create a parse error.
    pub fn parse(message: impl fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Create a geometry error.
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classify a reqwest error against a known request URL.
    ///
    /// reqwest collapses timeouts, connection failures and status errors
    /// into one opaque type; the engine keeps them apart so the fetcher can
    /// report which URLs failed and why.
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if error.is_decode() || error.is_body() {
            Self::Parse(error.to_string())
        } else {
            Self::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }

    /// Whether this error is recoverable at the fetch boundary (the batch
    /// continues with the remaining URLs).
    pub fn is_recoverable_fetch(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout { .. }
                | Self::HttpStatus { .. }
                | Self::Parse(_)
                | Self::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_taxonomy_is_recoverable() {
        assert!(
            AppError::Timeout {
                url: "http://x".into()
            }
            .is_recoverable_fetch()
        );
        assert!(
            AppError::HttpStatus {
                url: "http://x".into(),
                status: 503
            }
            .is_recoverable_fetch()
        );
        assert!(!AppError::StaleData.is_recoverable_fetch());
        assert!(!AppError::config("bad").is_recoverable_fetch());
    }
}
