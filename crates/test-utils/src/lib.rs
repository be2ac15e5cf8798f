//! Shared test utilities for the earthdata-acquisition workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Catalog and credential response fixtures
//! - Synthetic gridded dataset generators
//! - Small NetCDF granules written with libnetcdf
//! - An in-process mock HTTP server
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, spawn_mock_server};
//! ```

pub mod fixtures;
pub mod generators;
pub mod granules;
pub mod server;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use granules::*;
pub use server::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise approximate equality for value slices, treating NaN == NaN.
///
/// ```ignore
/// use test_utils::assert_values_eq;
///
/// assert_values_eq!(&[1.0, f64::NAN], &[1.0, f64::NAN]);
/// ```
#[macro_export]
macro_rules! assert_values_eq {
    ($left:expr, $right:expr) => {{
        let left: &[f64] = $left;
        let right: &[f64] = $right;
        assert_eq!(left.len(), right.len(), "length mismatch: {:?} vs {:?}", left, right);
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            if l.is_nan() && r.is_nan() {
                continue;
            }
            if (l - r).abs() > 1e-9 {
                panic!(
                    "assertion failed: values differ at {}\n  left: `{:?}`,\n right: `{:?}`",
                    i, left, right
                );
            }
        }
    }};
}
