//! NetCDF / HDF5 granule reader.
//!
//! Turns a NetCDF-4 (or NetCDF-classic, or HDF5 readable by libnetcdf) file
//! into a [`grid_dataset::Dataset`]. Values are CF-decoded (packing, fill
//! values, relative time units) and, apart from dimension coordinates,
//! read only when requested.
//!
//! # System Requirements
//!
//! Linking needs `libnetcdf` and `libhdf5` (e.g. `libnetcdf-dev libhdf5-dev`).

pub mod error;
pub mod native;
pub mod reader;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{silence_hdf5_errors, LocalFile};
pub use reader::{open_dataset, open_dataset_from_bytes, open_dataset_from_bytes_in, NetCdfArray};
