//! Error types for dataset construction, merging and loading.

use acquisition_common::AcquisitionError;
use thiserror::Error;

/// Errors that can occur while building or reading a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Failed to read array values from the backing source.
    #[error("failed to read '{name}': {message}")]
    ReadFailed { name: String, message: String },

    /// Array shape disagrees with the dimensions it is declared over.
    #[error("shape mismatch for '{name}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A dimension was redeclared with a different length.
    #[error("dimension '{name}' has length {existing}, cannot redeclare as {requested}")]
    DimensionConflict {
        name: String,
        existing: usize,
        requested: usize,
    },

    /// Referenced dimension does not exist.
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    /// Referenced variable does not exist.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// Inputs cannot be combined into one dataset.
    #[error("cannot merge datasets: {0}")]
    MergeConflict(String),

    /// Anything else structurally wrong.
    #[error("invalid dataset: {0}")]
    Invalid(String),
}

impl DatasetError {
    /// Create a ReadFailed error.
    pub fn read_failed(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ReadFailed {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a MergeConflict error.
    pub fn merge_conflict(msg: impl Into<String>) -> Self {
        Self::MergeConflict(msg.into())
    }
}

impl From<DatasetError> for AcquisitionError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::ReadFailed { .. } => AcquisitionError::DataReadError(err.to_string()),
            DatasetError::MergeConflict(msg) => AcquisitionError::MergeError(msg),
            other => AcquisitionError::DatasetOpen(other.to_string()),
        }
    }
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
