//! Configuration for the catalog client.

use std::time::Duration;

use acquisition_common::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};

/// CMR granule search endpoint (UMM JSON 1.4 rendering).
pub const CMR_GRANULE_SEARCH_URL: &str =
    "https://cmr.earthdata.nasa.gov/search/granules.umm_json_v1_4";

/// Configuration for the catalog client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Granule search endpoint.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Page size used for queries built from configuration.
    pub page_size: u32,

    /// Page limit used for queries built from configuration.
    pub max_pages: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: CMR_GRANULE_SEARCH_URL.to_string(),
            request_timeout_secs: 60,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CMR_BASE_URL") {
            config.base_url = val;
        }

        if let Ok(val) = std::env::var("CMR_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("CMR_PAGE_SIZE") {
            if let Ok(size) = val.parse() {
                config.page_size = size;
            }
        }

        if let Ok(val) = std::env::var("CMR_MAX_PAGES") {
            if let Ok(pages) = val.parse() {
                config.max_pages = pages;
            }
        }

        config
    }

    /// Point the client at another endpoint (local mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("catalog base_url must not be empty".to_string());
        }

        if self.page_size == 0 {
            return Err("catalog page_size must be > 0".to_string());
        }

        if self.max_pages == 0 {
            return Err("catalog max_pages must be > 0".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("catalog request_timeout_secs must be > 0".to_string());
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.base_url, CMR_GRANULE_SEARCH_URL);
        assert_eq!(config.page_size, 150);
        assert_eq!(config.max_pages, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CatalogConfig::default();
        config.page_size = 0;
        assert!(config.validate().is_err());

        config = CatalogConfig::default();
        config.max_pages = 0;
        assert!(config.validate().is_err());

        config = CatalogConfig::default().with_base_url("");
        assert!(config.validate().is_err());
    }
}
