//! Opening individual granules from object storage.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use grid_dataset::Dataset;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use tracing::{debug, instrument};

use crate::credentials::TemporaryCredentials;
use crate::error::{StorageError, StorageResult};

/// File suffixes decoded as NetCDF/HDF.
pub const NETCDF_SUFFIXES: &[&str] = &[".nc", ".nc4", ".hdf", ".h5", ".he5"];

/// Opens one stored granule as a dataset.
#[async_trait]
pub trait ObjectOpener: Send + Sync {
    async fn open(&self, path: &str, creds: &TemporaryCredentials) -> StorageResult<Dataset>;
}

/// Split `s3://bucket/key` into its bucket and key.
pub fn parse_s3_path(path: &str) -> StorageResult<(&str, &str)> {
    let rest = path
        .strip_prefix("s3://")
        .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok((bucket, key)),
        _ => Err(StorageError::InvalidPath(path.to_string())),
    }
}

/// Reads granules from S3 with temporary credentials.
#[derive(Debug, Clone)]
pub struct S3ObjectOpener {
    region: String,
    scratch_dir: Option<PathBuf>,
}

impl S3ObjectOpener {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            scratch_dir: None,
        }
    }

    /// Spill downloaded granules into `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    async fn fetch(&self, path: &str, creds: &TemporaryCredentials) -> StorageResult<Bytes> {
        let (bucket, key) = parse_s3_path(path)?;

        let store = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.region)
            .with_access_key_id(&creds.access_key_id)
            .with_secret_access_key(&creds.secret_access_key)
            .with_token(&creds.session_token)
            .build()
            .map_err(|e| StorageError::object_store(path, e))?;

        let result = store
            .get(&Path::from(key))
            .await
            .map_err(|e| StorageError::object_store(path, e))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::object_store(path, e))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }
}

#[async_trait]
impl ObjectOpener for S3ObjectOpener {
    #[instrument(skip(self, creds), fields(region = %self.region))]
    async fn open(&self, path: &str, creds: &TemporaryCredentials) -> StorageResult<Dataset> {
        // Reject unknown formats before paying for the download.
        check_format(path)?;
        let bytes = self.fetch(path, creds).await?;
        decode_granule(path.to_string(), bytes, self.scratch_dir.clone()).await
    }
}

fn check_format(path: &str) -> StorageResult<()> {
    let lower = path.to_lowercase();
    if NETCDF_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        Ok(())
    } else {
        Err(StorageError::UnsupportedFormat {
            path: path.to_string(),
            reason: "not a NetCDF/HDF file".to_string(),
        })
    }
}

/// Decode granule bytes off the async runtime.
pub(crate) async fn decode_granule(
    path: String,
    bytes: Bytes,
    scratch_dir: Option<PathBuf>,
) -> StorageResult<Dataset> {
    tokio::task::spawn_blocking(move || {
        let opened = match scratch_dir.as_deref() {
            Some(dir) => netcdf_parser::open_dataset_from_bytes_in(dir, &bytes),
            None => netcdf_parser::open_dataset_from_bytes(&bytes),
        };
        opened.map_err(|e| StorageError::decode(path, e))
    })
    .await
    .map_err(|e| StorageError::Task(e.to_string()))?
}
