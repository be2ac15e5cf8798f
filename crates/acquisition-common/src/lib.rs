//! Common types and utilities shared across the acquisition crates.

pub mod error;
pub mod query;
pub mod time;

pub use error::{AcqResult, AcquisitionError};
pub use query::{SearchQuery, SpatialFilter, SpatialParameter, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
pub use time::{parse_date, parse_datetime, TemporalRange};
