// src/crawler/fetch.rs

//! Page fetching collaborator.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CrawlerConfig;
use crate::utils::http;

/// Fetches raw page bodies for the refresh task.
///
/// Retry, backoff and authentication live behind implementations of this
/// trait; the orchestrator only ever sees a body or an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page at `url`, returning its HTML body.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// [`PageFetcher`] backed by a configured HTTP client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the configured user agent and request timeout.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
