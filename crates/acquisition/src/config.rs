//! Configuration for the acquisition pipeline.

use catalog_client::CatalogConfig;
use serde::{Deserialize, Serialize};
use storage::{CredentialConfig, IngestConfig};

/// Everything the facade needs to reach the catalog and object storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub catalog: CatalogConfig,
    pub credentials: CredentialConfig,
    pub ingest: IngestConfig,
}

impl AcquisitionConfig {
    /// Load every section from environment variables.
    pub fn from_env() -> Self {
        Self {
            catalog: CatalogConfig::from_env(),
            credentials: CredentialConfig::from_env(),
            ingest: IngestConfig::from_env(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.catalog.validate().map_err(|e| format!("catalog: {}", e))?;
        self.credentials
            .validate()
            .map_err(|e| format!("credentials: {}", e))?;
        self.ingest.validate().map_err(|e| format!("ingest: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AcquisitionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog.page_size, 150);
        assert_eq!(config.ingest.cache_capacity, 32);
    }

    #[test]
    fn test_validate_names_section() {
        let mut config = AcquisitionConfig::default();
        config.ingest.cache_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("ingest:"));
    }
}
