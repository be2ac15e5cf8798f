//! Error types for catalog searches.

use acquisition_common::AcquisitionError;
use thiserror::Error;

/// Errors that can occur while searching the catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("catalog request for page {page} failed: {message}")]
    Transport { page: u32, message: String },

    /// The catalog answered with a non-success status.
    #[error("catalog returned HTTP {status} for page {page}")]
    Status { page: u32, status: u16 },

    /// A hit (or the page envelope) is missing a required field.
    #[error("malformed catalog response on page {page}: {message}")]
    Malformed { page: u32, message: String },

    /// The query itself was rejected before any request was sent.
    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl CatalogError {
    /// Page the error was observed on, if it came from a request.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Transport { page, .. } | Self::Status { page, .. } | Self::Malformed { page, .. } => {
                Some(*page)
            }
            Self::InvalidQuery(_) | Self::Client(_) => None,
        }
    }

    /// True for connection failures and non-success statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }

    pub(crate) fn malformed(page: u32, msg: impl Into<String>) -> Self {
        Self::Malformed {
            page,
            message: msg.into(),
        }
    }
}

impl From<CatalogError> for AcquisitionError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Malformed { .. } => AcquisitionError::MalformedMetadata(err.to_string()),
            CatalogError::InvalidQuery(msg) => AcquisitionError::InvalidParameter {
                param: "query".to_string(),
                message: msg,
            },
            CatalogError::Client(msg) => AcquisitionError::ConfigError(msg),
            CatalogError::Transport { .. } | CatalogError::Status { .. } => {
                AcquisitionError::CatalogUnavailable(err.to_string())
            }
        }
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
