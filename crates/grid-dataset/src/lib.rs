//! Gridded dataset model used by the acquisition pipeline.
//!
//! A [`Dataset`] is a set of named dimensions plus variables laid out over
//! them. Variable payloads are [`LazyArray`] handles, so opening many files
//! and merging them costs only metadata until values are actually read.
//!
//! - [`combine_by_coords`] outer-joins datasets on their index coordinates.
//! - [`DimensionNormalizer`] maps `Time`/`Latitude`/`Longitude` style names
//!   onto `time`/`lat`/`lon`.
//! - [`cf`] holds the CF-convention decoding shared by the file readers.

pub mod array;
pub mod cf;
pub mod dataset;
pub mod error;
pub mod merge;
pub mod normalize;

pub use array::{ArrayData, ArraySource, InMemoryArray, LazyArray};
pub use cf::{Packing, TimeUnits, EPOCH_UNITS};
pub use dataset::{Dataset, Dimension, Index, Variable, VariableRole};
pub use error::{DatasetError, Result};
pub use merge::combine_by_coords;
pub use normalize::DimensionNormalizer;
