//! Configuration for credential fetching and dataset ingestion.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Region the Earthdata cloud buckets live in.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Entries kept by each memo cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Granules opened at once within one batch.
pub const DEFAULT_MAX_CONCURRENT_OPENS: usize = 8;

/// Temporary S3 credential endpoints keyed by catalog provider id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints(BTreeMap<String, String>);

impl Default for ProviderEndpoints {
    fn default() -> Self {
        let podaac = "https://archive.podaac.earthdata.nasa.gov/s3credentials";
        Self(
            [
                ("GES_DISC", "https://data.gesdisc.earthdata.nasa.gov/s3credentials"),
                ("PODAAC", podaac),
                ("POCLOUD", podaac),
                ("LPDAAC", "https://data.lpdaac.earthdatacloud.nasa.gov/s3credentials"),
                ("ORNLDAAC", "https://data.ornldaac.earthdata.nasa.gov/s3credentials"),
                ("GHRCDAAC", "https://data.ghrc.earthdata.nasa.gov/s3credentials"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        )
    }
}

impl ProviderEndpoints {
    /// No providers at all.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Add or replace the endpoint for a provider.
    pub fn with_endpoint(mut self, provider: impl Into<String>, url: impl Into<String>) -> Self {
        self.0.insert(provider.into(), url.into());
        self
    }

    pub fn endpoint(&self, provider: &str) -> Option<&str> {
        self.0.get(provider).map(String::as_str)
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// How temporary credentials are requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub endpoints: ProviderEndpoints,

    /// Earthdata Login bearer token sent with credential requests.
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            endpoints: ProviderEndpoints::default(),
            bearer_token: None,
            request_timeout_secs: 30,
        }
    }
}

impl CredentialConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(token) = std::env::var("EARTHDATA_TOKEN") {
            if !token.trim().is_empty() {
                config.bearer_token = Some(token);
            }
        }

        if let Ok(val) = std::env::var("CREDENTIAL_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout_secs = secs;
            }
        }

        config
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be > 0".to_string());
        }
        for provider in self.endpoints.providers() {
            let url = self.endpoints.endpoint(provider).unwrap_or_default();
            if url::Url::parse(url).is_err() {
                return Err(format!("credential endpoint for {} is not a URL: {}", provider, url));
            }
        }
        Ok(())
    }
}

/// Dataset ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Merged datasets kept in memory.
    pub cache_capacity: usize,

    /// Provider credentials kept in memory.
    pub credential_cache_capacity: usize,

    /// Granules opened concurrently per batch.
    pub max_concurrent_opens: usize,

    /// Object storage region.
    pub region: String,

    /// Directory for granules spilled to disk. System temp dir when unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            credential_cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_concurrent_opens: DEFAULT_MAX_CONCURRENT_OPENS,
            region: DEFAULT_REGION.to_string(),
            scratch_dir: None,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("INGEST_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("CREDENTIAL_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.credential_cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("MAX_CONCURRENT_OPENS") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_opens = n;
            }
        }

        if let Ok(region) = std::env::var("AWS_REGION") {
            config.region = region;
        }

        if let Ok(dir) = std::env::var("INGEST_SCRATCH_DIR") {
            if !dir.trim().is_empty() {
                config.scratch_dir = Some(PathBuf::from(dir));
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_capacity == 0 {
            return Err("cache_capacity must be > 0".to_string());
        }
        if self.credential_cache_capacity == 0 {
            return Err("credential_cache_capacity must be > 0".to_string());
        }
        if self.max_concurrent_opens == 0 {
            return Err("max_concurrent_opens must be > 0".to_string());
        }
        if self.region.trim().is_empty() {
            return Err("region must not be empty".to_string());
        }
        if let Some(dir) = &self.scratch_dir {
            if !dir.is_dir() {
                return Err(format!("scratch_dir {} is not a directory", dir.display()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let endpoints = ProviderEndpoints::default();
        assert_eq!(
            endpoints.endpoint("GES_DISC"),
            Some("https://data.gesdisc.earthdata.nasa.gov/s3credentials")
        );
        assert_eq!(endpoints.endpoint("POCLOUD"), endpoints.endpoint("PODAAC"));
        assert!(endpoints.endpoint("NSIDC_ECS").is_none());
        assert_eq!(endpoints.providers().count(), 6);
    }

    #[test]
    fn test_endpoint_override() {
        let endpoints = ProviderEndpoints::empty().with_endpoint("TEST", "http://127.0.0.1/creds");
        assert_eq!(endpoints.endpoint("TEST"), Some("http://127.0.0.1/creds"));
    }

    #[test]
    fn test_credential_config_validate() {
        assert!(CredentialConfig::default().validate().is_ok());

        let bad = CredentialConfig::default()
            .with_endpoints(ProviderEndpoints::empty().with_endpoint("X", "not a url"));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_ingest_config_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.cache_capacity, 32);
        assert_eq!(config.max_concurrent_opens, 8);
        assert_eq!(config.region, "us-west-2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ingest_config_validate() {
        let mut config = IngestConfig::default();
        config.max_concurrent_opens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scratch_dir_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = IngestConfig::default();

        config.scratch_dir = Some(dir.path().to_path_buf());
        assert!(config.validate().is_ok());

        config.scratch_dir = Some(dir.path().join("missing"));
        assert!(config.validate().is_err());
    }
}
