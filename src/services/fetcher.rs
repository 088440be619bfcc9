// src/services/fetcher.rs

//! Feed fetcher service.
//!
//! Retrieves all per-day GeoJSON documents for a refresh concurrently.
//! Individual failures are logged and excluded from the result, never
//! aborting the batch: the caller only sees which URLs produced usable
//! data.

use std::time::Duration;

use futures::future;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{FeatureCollection, PollingConfig};

/// Create the configured HTTP client shared by all engine requests.
pub fn create_client(config: &PollingConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))?;
    Ok(client)
}

/// A successfully fetched and parsed per-day document.
#[derive(Debug)]
pub struct FetchedDocument {
    pub url: String,
    pub collection: FeatureCollection,
}

/// Summary of one fetch batch.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub documents: Vec<FetchedDocument>,
    pub scheduled: usize,
    pub failures: usize,
}

/// Service fetching bulletin documents for the refresh cycle.
pub struct FeedFetcher<'a> {
    client: &'a Client,
}

impl<'a> FeedFetcher<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetch every URL concurrently and await the whole batch.
    ///
    /// Results keep the order of `urls`, so merging is deterministic no
    /// matter which request completed first.
    pub async fn fetch_all(&self, urls: &[String]) -> FetchOutcome {
        let mut outcome = FetchOutcome {
            scheduled: urls.len(),
            ..FetchOutcome::default()
        };

        let jobs = urls.iter().map(|url| async move {
            let result = self.fetch_document(url).await;
            (url.clone(), result)
        });

        for (url, result) in future::join_all(jobs).await {
            match result {
                Ok(collection) => outcome.documents.push(FetchedDocument { url, collection }),
                Err(error) if error.is_recoverable_fetch() => {
                    outcome.failures += 1;
                    log::warn!("failed to fetch bulletin document {url}: {error}");
                }
                Err(error) => {
                    outcome.failures += 1;
                    log::error!("failed to fetch bulletin document {url}: {error}");
                }
            }
        }
        outcome
    }

    async fn fetch_document(&self, url: &str) -> Result<FeatureCollection> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::from_reqwest(url, e))?;
        let body = response
            .text()
            .await
            .map_err(|e| AppError::from_reqwest(url, e))?;
        serde_json::from_str(&body).map_err(|e| AppError::parse(format!("{url}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_client_from_defaults() {
        assert!(create_client(&PollingConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let client = create_client(&PollingConfig::default()).unwrap();
        let fetcher = FeedFetcher::new(&client);
        let outcome = fetcher.fetch_all(&[]).await;
        assert_eq!(outcome.scheduled, 0);
        assert_eq!(outcome.failures, 0);
        assert!(outcome.documents.is_empty());
    }
}
