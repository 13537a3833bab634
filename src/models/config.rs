//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Refresh run settings
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.base_url.trim().is_empty() {
            return Err(AppError::validation("crawler.base_url is empty"));
        }
        if url::Url::parse(&self.crawler.base_url).is_err() {
            return Err(AppError::validation("crawler.base_url is not a valid URL"));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.refresh.refresh_timeout_secs == 0 {
            return Err(AppError::validation(
                "refresh.refresh_timeout_secs must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// URL of the board's forum index page, where the crawl starts
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Refresh run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Wall-clock deadline for a full refresh run in seconds.
    /// The run fails wholesale when the deadline elapses.
    #[serde(default = "defaults::refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_timeout_secs: defaults::refresh_timeout(),
        }
    }
}

mod defaults {
    pub fn base_url() -> String {
        "https://forums.somethingawful.com/".to_string()
    }

    pub fn user_agent() -> String {
        "boardindex/0.1 (forum catalog crawler)".to_string()
    }

    pub fn timeout() -> u64 {
        30
    }

    pub fn refresh_timeout() -> u64 {
        300
    }
}
