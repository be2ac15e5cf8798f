//! Credential and dataset caches for Earthdata cloud storage.
//!
//! - [`CredentialCache`]: temporary S3 credentials per data provider
//! - [`IngestionCache`]: file sets and Zarr stores opened as merged datasets
//! - [`SingleFlightCache`]: the bounded memo both are built on

pub mod config;
pub mod credentials;
pub mod error;
pub mod ingest;
pub mod memo;
pub mod opener;
pub mod zarr;

pub use config::{
    CredentialConfig, IngestConfig, ProviderEndpoints, DEFAULT_CACHE_CAPACITY,
    DEFAULT_MAX_CONCURRENT_OPENS, DEFAULT_REGION,
};
pub use credentials::{CredentialCache, ProviderCredential, TemporaryCredentials};
pub use error::{StorageError, StorageResult};
pub use ingest::{IngestKey, IngestionCache};
pub use memo::{CacheStats, SingleFlightCache};
pub use opener::{parse_s3_path, ObjectOpener, S3ObjectOpener, NETCDF_SUFFIXES};
pub use zarr::{open_zarr, storage_for, TokioBlockOn, ZarrArray, ZarrStoreOpener};
