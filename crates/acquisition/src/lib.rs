//! Earthdata acquisition pipeline.
//!
//! [`AcquisitionFacade`] turns a collection id plus either a catalog query or
//! a Zarr store path into a normalized, lazily loaded dataset:
//!
//! ```text
//! SearchQuery ─► SearchClient ─► UrlRefiner ─► IngestionCache ─┐
//! store path  ─────────────────────────────► IngestionCache ─┴► DimensionNormalizer
//! ```

pub mod config;
pub mod facade;
pub mod plan;
pub mod registry;

pub use config::AcquisitionConfig;
pub use facade::{AcquisitionFacade, AcquisitionResult, AcquisitionSource};
pub use plan::AcquisitionPlan;
pub use registry::{
    is_excluded_variable, parse_variable_option, CollectionSummary, DatasetRegistry,
    EXCLUDED_VARIABLES,
};
