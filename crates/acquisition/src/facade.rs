//! Single entry point: collection in, normalized dataset out.

use std::sync::Arc;

use acquisition_common::{AcqResult, AcquisitionError, SearchQuery};
use catalog_client::{SearchClient, SearchOutcome, UrlRefiner};
use grid_dataset::{Dataset, DimensionNormalizer};
use serde::Serialize;
use storage::{CredentialCache, IngestionCache};
use tracing::{info, instrument, warn};

use crate::config::AcquisitionConfig;
use crate::plan::AcquisitionPlan;
use crate::registry::DatasetRegistry;

/// Where a collection's data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionSource {
    /// Search the catalog and open every matching granule.
    Catalog(SearchQuery),
    /// Open a Zarr store directly.
    Store(String),
}

/// Outcome of acquiring one collection.
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionResult {
    pub key: String,
    #[serde(skip)]
    pub dataset: Option<Arc<Dataset>>,
    /// Every variable name in the dataset, coordinates included.
    pub variables: Vec<String>,
}

impl AcquisitionResult {
    /// A result with no data.
    pub fn absent(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            dataset: None,
            variables: Vec::new(),
        }
    }

    fn present(key: impl Into<String>, dataset: Dataset) -> Self {
        let variables = dataset.variable_names();
        Self {
            key: key.into(),
            dataset: Some(Arc::new(dataset)),
            variables,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.dataset.is_none()
    }
}

/// Composes search, refinement, ingestion and normalization.
pub struct AcquisitionFacade {
    search: SearchClient,
    refiner: UrlRefiner,
    ingest: Arc<IngestionCache>,
    normalizer: DimensionNormalizer,
}

impl AcquisitionFacade {
    /// Build the whole pipeline from configuration.
    pub fn new(config: &AcquisitionConfig) -> AcqResult<Self> {
        config.validate().map_err(AcquisitionError::ConfigError)?;

        let search = SearchClient::new(config.catalog.clone())?;
        let credentials = Arc::new(CredentialCache::new(
            config.credentials.clone(),
            config.ingest.credential_cache_capacity,
        )?);
        let ingest = Arc::new(IngestionCache::new(credentials, &config.ingest));

        Ok(Self::from_parts(search, UrlRefiner::default(), ingest))
    }

    pub fn from_parts(search: SearchClient, refiner: UrlRefiner, ingest: Arc<IngestionCache>) -> Self {
        Self {
            search,
            refiner,
            ingest,
            normalizer: DimensionNormalizer::new(),
        }
    }

    pub fn ingest(&self) -> &Arc<IngestionCache> {
        &self.ingest
    }

    pub fn search_client(&self) -> &SearchClient {
        &self.search
    }

    /// Acquire one collection.
    ///
    /// Catalog outages, missing credentials and unopenable granules give an
    /// absent result. Malformed catalog metadata and store open failures are
    /// errors.
    #[instrument(skip(self, source))]
    pub async fn acquire(
        &self,
        collection_id: &str,
        source: AcquisitionSource,
    ) -> AcqResult<AcquisitionResult> {
        let dataset = match source {
            AcquisitionSource::Catalog(query) => self.from_catalog(&query).await?,
            AcquisitionSource::Store(path) => Some(self.ingest.dataset_for_store(&path).await?),
        };

        let Some(dataset) = dataset else {
            info!(collection_id, "No data acquired");
            return Ok(AcquisitionResult::absent(collection_id));
        };

        let normalized = self.normalizer.normalize(Dataset::clone(&dataset));
        let result = AcquisitionResult::present(collection_id, normalized);
        info!(
            collection_id,
            variables = result.variables.len(),
            "Acquired dataset"
        );
        Ok(result)
    }

    async fn from_catalog(&self, query: &SearchQuery) -> AcqResult<Option<Arc<Dataset>>> {
        let result = match self.search.search(query).await {
            SearchOutcome::Complete(result) => result,
            SearchOutcome::Failed { error, .. } if error.is_transport() => {
                warn!(short_name = %query.short_name, error = %error, "Catalog unavailable");
                return Ok(None);
            }
            SearchOutcome::Failed { error, .. } => return Err(error.into()),
        };

        let Some(provider) = result.provider_id.clone() else {
            info!(short_name = %query.short_name, "Catalog returned no granules");
            return Ok(None);
        };

        let paths: Vec<String> = self.refiner.refine(result.file_addresses()).into_iter().collect();
        if paths.is_empty() {
            info!(short_name = %query.short_name, %provider, "No granule paths after refinement");
            return Ok(None);
        }

        Ok(self.ingest.dataset_for(&provider, &paths).await)
    }

    /// Acquire every collection in `plan`.
    ///
    /// A failing collection is logged and recorded as absent; the others
    /// still run.
    #[instrument(skip(self, plan), fields(collections = plan.len()))]
    pub async fn acquire_all(&self, plan: &AcquisitionPlan) -> AcqResult<DatasetRegistry> {
        let requests = plan.requests(self.search.config())?;
        let mut registry = DatasetRegistry::new();

        for (key, source) in requests {
            match self.acquire(&key, source).await {
                Ok(result) => registry.insert(result),
                Err(e) => {
                    warn!(collection_id = %key, error = %e, "Acquisition failed");
                    registry.record_failure(key, e.to_string());
                }
            }
        }

        Ok(registry)
    }
}
