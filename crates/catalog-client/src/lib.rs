//! Catalog (CMR) granule search and URL refinement.
//!
//! Resolves a collection / spatial / temporal query into a deduplicated,
//! sorted set of data URLs plus the provider that hosts them, and maps those
//! URLs onto object-storage addresses.
//!
//! # Example
//!
//! ```ignore
//! use catalog_client::{CatalogConfig, SearchClient, UrlRefiner};
//!
//! let client = SearchClient::new(CatalogConfig::from_env())?;
//! let outcome = client.search(&query).await;
//! let paths = UrlRefiner::default().refine(outcome.file_addresses());
//! ```

pub mod config;
pub mod error;
pub mod records;
pub mod refine;
pub mod search;

pub use config::{CatalogConfig, CMR_GRANULE_SEARCH_URL};
pub use error::{CatalogError, CatalogResult};
pub use records::{FileRecord, SearchResult};
pub use refine::{UrlRefiner, DEFAULT_SUFFIXES};
pub use search::{
    build_request_params, classify_page, PageOutcome, SearchClient, SearchOutcome,
    FATAL_PAGE_LIMIT,
};
