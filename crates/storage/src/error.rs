//! Error types for storage and ingestion.

use acquisition_common::AcquisitionError;
use grid_dataset::DatasetError;
use thiserror::Error;

/// Errors raised while fetching credentials or opening stored data.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Object store request failed.
    #[error("object store error for {path}: {message}")]
    ObjectStore { path: String, message: String },

    /// Path could not be interpreted as a storage location.
    #[error("invalid storage path '{0}'")]
    InvalidPath(String),

    /// Credential endpoint unreachable, refused, or returned garbage.
    #[error("credential request failed: {0}")]
    Credentials(String),

    /// No credential endpoint is configured for this provider.
    #[error("no credential endpoint for provider '{0}'")]
    UnknownProvider(String),

    /// Granule format is not recognized or not compiled in.
    #[error("unsupported format for '{path}': {reason}")]
    UnsupportedFormat { path: String, reason: String },

    /// Bytes were fetched but could not be decoded.
    #[error("failed to decode {path}: {message}")]
    Decode { path: String, message: String },

    /// Zarr hierarchy or array could not be opened.
    #[error("zarr error for {path}: {message}")]
    Zarr { path: String, message: String },

    /// Dataset assembly failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Background task failed to complete.
    #[error("task failed: {0}")]
    Task(String),
}

impl StorageError {
    pub fn object_store(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::ObjectStore {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn zarr(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Zarr {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn decode(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for AcquisitionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Credentials(msg) => AcquisitionError::CredentialError(msg),
            StorageError::UnknownProvider(p) => {
                AcquisitionError::CredentialError(format!("unknown provider {}", p))
            }
            StorageError::Dataset(inner) => inner.into(),
            StorageError::ObjectStore { .. } => AcquisitionError::StorageError(err.to_string()),
            other => AcquisitionError::DatasetOpen(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
