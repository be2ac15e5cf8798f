//! Canonical naming for time / latitude / longitude.
//!
//! Files from different providers spell the same axes differently
//! (`Time`, `Latitude`, `LONGITUDE`, ...). Downstream code only ever asks
//! for `time`, `lat` and `lon`.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dataset::Dataset;

/// Lowercased spelling -> canonical name.
const ALIASES: &[(&str, &str)] = &[
    ("time", "time"),
    ("lat", "lat"),
    ("lon", "lon"),
    ("latitude", "lat"),
    ("longitude", "lon"),
];

/// Renames non-canonical time/lat/lon dimensions and coordinates.
///
/// Only names that are not already all-lowercase are considered, so a
/// dataset that uses `latitude` is left alone while `Latitude` becomes
/// `lat`. Applying the normalizer twice is the same as applying it once.
#[derive(Debug, Clone, Default)]
pub struct DimensionNormalizer;

impl DimensionNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Canonical name for `name`, if it is a mixed- or upper-case alias.
    pub fn canonical_name(name: &str) -> Option<&'static str> {
        let lower = name.to_lowercase();
        if lower == name {
            return None;
        }
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, canonical)| *canonical)
    }

    pub fn normalize(&self, mut dataset: Dataset) -> Dataset {
        let dim_renames = plan(dataset.dims().iter().map(|d| d.name.as_str()));
        let coord_renames = plan(dataset.coordinate_names().iter().map(String::as_str));

        let dims_applied = dataset.rename_dims(&dim_renames);
        let coords_applied = dataset.rename_vars(&coord_renames);

        if !dims_applied.is_empty() && !coords_applied.is_empty() {
            for new in coords_applied.values() {
                if !dataset.has_dim(new) {
                    continue;
                }
                if let Err(e) = dataset.set_index(new) {
                    warn!(coord = %new, error = %e, "Could not restore index after rename");
                }
            }
        }

        if !dims_applied.is_empty() || !coords_applied.is_empty() {
            debug!(dims = ?dims_applied, coords = ?coords_applied, "Normalized dimension names");
        }
        dataset
    }
}

fn plan<'a>(names: impl Iterator<Item = &'a str>) -> BTreeMap<String, String> {
    names
        .filter_map(|name| {
            DimensionNormalizer::canonical_name(name)
                .map(|canonical| (name.to_string(), canonical.to_string()))
        })
        .collect()
}
