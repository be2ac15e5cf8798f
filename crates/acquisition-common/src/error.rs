//! Error types shared across the acquisition crates.

use thiserror::Error;

/// Result type alias using AcquisitionError.
pub type AcqResult<T> = Result<T, AcquisitionError>;

/// Primary error type for acquisition operations.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    // === Query Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid temporal range: {0}")]
    InvalidTemporalRange(String),

    #[error("Invalid spatial filter: {0}")]
    InvalidSpatialFilter(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Catalog Errors ===
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Malformed catalog metadata: {0}")]
    MalformedMetadata(String),

    // === Data Errors ===
    #[error("Failed to open dataset: {0}")]
    DatasetOpen(String),

    #[error("Failed to read data: {0}")]
    DataReadError(String),

    #[error("Failed to merge datasets: {0}")]
    MergeError(String),

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    // === Infrastructure Errors ===
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AcquisitionError {
    /// Whether the caller should render this as "no data" rather than a hard failure.
    ///
    /// Transport-class failures resolve to empty results at the acquisition
    /// boundary; everything else is surfaced.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AcquisitionError::CatalogUnavailable(_)
                | AcquisitionError::CredentialError(_)
                | AcquisitionError::StorageError(_)
        )
    }

    /// Short machine-readable code for summaries and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AcquisitionError::MissingParameter(_) => "MissingParameter",
            AcquisitionError::InvalidParameter { .. } => "InvalidParameter",
            AcquisitionError::InvalidTemporalRange(_) => "InvalidTemporalRange",
            AcquisitionError::InvalidSpatialFilter(_) => "InvalidSpatialFilter",
            AcquisitionError::InvalidTime(_) => "InvalidTime",
            AcquisitionError::CatalogUnavailable(_) => "CatalogUnavailable",
            AcquisitionError::MalformedMetadata(_) => "MalformedMetadata",
            AcquisitionError::DatasetOpen(_) => "DatasetOpen",
            AcquisitionError::DataReadError(_) => "DataReadError",
            AcquisitionError::MergeError(_) => "MergeError",
            AcquisitionError::StorageError(_) => "StorageError",
            AcquisitionError::CredentialError(_) => "CredentialError",
            AcquisitionError::ConfigError(_) => "ConfigError",
            AcquisitionError::InternalError(_) => "InternalError",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        AcquisitionError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for AcquisitionError {
    fn from(err: serde_json::Error) -> Self {
        AcquisitionError::InternalError(format!("JSON error: {}", err))
    }
}
