//! Memoized file-set → merged dataset cache.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use grid_dataset::{combine_by_coords, Dataset};
use tracing::{debug, info, instrument, warn};

use crate::config::IngestConfig;
use crate::credentials::{CredentialCache, ProviderCredential, TemporaryCredentials};
use crate::error::{StorageError, StorageResult};
use crate::memo::{CacheStats, SingleFlightCache};
use crate::opener::{ObjectOpener, S3ObjectOpener};
use crate::zarr::ZarrStoreOpener;

/// Cache key for one provider's file set.
///
/// Order matters: the same paths in a different order are a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngestKey {
    provider: String,
    paths: Arc<[String]>,
}

impl IngestKey {
    pub fn new<I, S>(provider: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider: provider.into(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

/// Why a batch produced no dataset. Never memoized.
#[derive(Debug)]
enum Absent {
    NoCredentials,
    NothingOpened,
    MergeFailed,
}

impl fmt::Display for Absent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "credentials unavailable"),
            Self::NothingOpened => write!(f, "no granule could be opened"),
            Self::MergeFailed => write!(f, "granules could not be merged"),
        }
    }
}

/// Turns file sets and store paths into merged, shared datasets.
pub struct IngestionCache {
    credentials: Arc<CredentialCache>,
    opener: Arc<dyn ObjectOpener>,
    zarr: ZarrStoreOpener,
    datasets: SingleFlightCache<IngestKey, Arc<Dataset>>,
    stores: SingleFlightCache<String, Arc<Dataset>>,
    max_concurrent_opens: usize,
}

impl IngestionCache {
    /// Cache reading granules from S3.
    pub fn new(credentials: Arc<CredentialCache>, config: &IngestConfig) -> Self {
        let opener = Arc::new(
            S3ObjectOpener::new(config.region.clone()).with_scratch_dir(config.scratch_dir.clone()),
        );
        Self::with_opener(credentials, opener, config)
    }

    /// Cache with a custom granule opener.
    pub fn with_opener(
        credentials: Arc<CredentialCache>,
        opener: Arc<dyn ObjectOpener>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            credentials,
            opener,
            zarr: ZarrStoreOpener::new(config.region.clone()),
            datasets: SingleFlightCache::new(config.cache_capacity),
            stores: SingleFlightCache::new(config.cache_capacity),
            max_concurrent_opens: config.max_concurrent_opens.max(1),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// Merged dataset for `paths` of `provider`, or `None` when credentials
    /// are unavailable or no path could be opened.
    ///
    /// Successful results are memoized by the exact path sequence.
    #[instrument(skip(self, paths), fields(files = paths.len()))]
    pub async fn dataset_for(&self, provider: &str, paths: &[String]) -> Option<Arc<Dataset>> {
        let key = IngestKey::new(provider, paths.iter().cloned());

        let result = self
            .datasets
            .get_or_try_load(key.clone(), || self.load(key))
            .await;

        match result {
            Ok(dataset) => Some(dataset),
            Err(reason) => {
                info!(provider, %reason, "No dataset for file set");
                None
            }
        }
    }

    async fn load(&self, key: IngestKey) -> Result<Arc<Dataset>, Absent> {
        let creds = match self.credentials.credentials_for(key.provider()).await {
            ProviderCredential::Available(creds) => creds,
            ProviderCredential::Unavailable => return Err(Absent::NoCredentials),
        };

        let opened = self.open_all(key.paths(), &creds).await;
        if opened.is_empty() {
            return Err(Absent::NothingOpened);
        }

        let count = opened.len();
        match combine_by_coords(opened) {
            Ok(merged) => {
                debug!(opened = count, of = key.paths().len(), "Merged granules");
                Ok(Arc::new(merged))
            }
            Err(e) => {
                warn!(error = %e, "Failed to merge granules");
                Err(Absent::MergeFailed)
            }
        }
    }

    /// Open every path concurrently; failures are logged and dropped.
    /// Survivors come back in input order.
    async fn open_all(&self, paths: &[String], creds: &TemporaryCredentials) -> Vec<Dataset> {
        let opens: Vec<_> = paths
            .iter()
            .enumerate()
            .map(|(i, path)| async move {
                match self.opener.open(path, creds).await {
                    Ok(dataset) => Some((i, dataset)),
                    Err(e) => {
                        warn!(path = %path, error = %e, "Skipping granule");
                        None
                    }
                }
            })
            .collect();
        let mut opened: Vec<(usize, Dataset)> = stream::iter(opens)
            .buffer_unordered(self.max_concurrent_opens)
            .filter_map(|opened| async move { opened })
            .collect()
            .await;

        opened.sort_by_key(|(i, _)| *i);
        opened.into_iter().map(|(_, dataset)| dataset).collect()
    }

    /// Dataset at a Zarr store path. Open errors are returned to the caller.
    #[instrument(skip(self))]
    pub async fn dataset_for_store(&self, path: &str) -> StorageResult<Arc<Dataset>> {
        self.stores
            .get_or_try_load(path.to_string(), || async {
                let dataset = self.zarr.open(path).await?;
                Ok::<_, StorageError>(Arc::new(dataset))
            })
            .await
    }

    /// Statistics for the file-set cache.
    pub async fn stats(&self) -> CacheStats {
        self.datasets.stats().await
    }

    /// Statistics for the store-path cache.
    pub async fn store_stats(&self) -> CacheStats {
        self.stores.stats().await
    }
}
