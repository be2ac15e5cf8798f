//! Acquired datasets keyed by collection, and the variable options derived
//! from them.

use std::sync::Arc;

use grid_dataset::Dataset;
use serde::Serialize;

use crate::facade::AcquisitionResult;

/// Variables that describe the grid rather than hold data.
pub const EXCLUDED_VARIABLES: &[&str] = &[
    "lat",
    "lon",
    "time",
    "time_bnds",
    "time_bounds",
    "lat_bounds",
    "lon_bounds",
];

/// Separator between collection key and variable in a variable option.
pub const OPTION_SEPARATOR: char = ':';

/// Split `"<key>:<variable>"` back into its parts.
pub fn parse_variable_option(option: &str) -> Option<(&str, &str)> {
    let (key, variable) = option.split_once(OPTION_SEPARATOR)?;
    if key.is_empty() || variable.is_empty() {
        return None;
    }
    Some((key, variable))
}

/// Whether `variable` is a grid-bookkeeping name (case-insensitive).
pub fn is_excluded_variable(variable: &str) -> bool {
    let lower = variable.to_lowercase();
    EXCLUDED_VARIABLES.contains(&lower.as_str())
}

/// Summary of one collection for reports.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub key: String,
    pub available: bool,
    pub variables: Vec<String>,
    pub dims: Vec<(String, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Results of a plan, in plan order.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    results: Vec<AcquisitionResult>,
    errors: Vec<(String, String)>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result, replacing any earlier one for the same key.
    pub fn insert(&mut self, result: AcquisitionResult) {
        self.results.retain(|r| r.key != result.key);
        self.results.push(result);
    }

    /// Record a collection that failed outright. It is kept as absent.
    pub fn record_failure(&mut self, key: impl Into<String>, error: impl Into<String>) {
        let key = key.into();
        self.insert(AcquisitionResult::absent(key.clone()));
        self.errors.retain(|(k, _)| *k != key);
        self.errors.push((key, error.into()));
    }

    pub fn get(&self, key: &str) -> Option<&AcquisitionResult> {
        self.results.iter().find(|r| r.key == key)
    }

    pub fn dataset(&self, key: &str) -> Option<&Arc<Dataset>> {
        self.get(key).and_then(|r| r.dataset.as_ref())
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, e)| e.as_str())
    }

    pub fn results(&self) -> &[AcquisitionResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Every `"<key>:<variable>"` pair, collections in plan order.
    pub fn variable_options(&self) -> Vec<String> {
        self.results
            .iter()
            .flat_map(|r| {
                r.variables
                    .iter()
                    .map(move |v| format!("{}{}{}", r.key, OPTION_SEPARATOR, v))
            })
            .collect()
    }

    /// Variable options worth showing first: bookkeeping variables removed.
    pub fn starter_variables(&self) -> Vec<String> {
        self.variable_options()
            .into_iter()
            .filter(|option| {
                parse_variable_option(option)
                    .map(|(_, variable)| !is_excluded_variable(variable))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<CollectionSummary> {
        self.results
            .iter()
            .map(|r| CollectionSummary {
                key: r.key.clone(),
                available: r.dataset.is_some(),
                variables: r.variables.clone(),
                dims: r
                    .dataset
                    .as_ref()
                    .map(|ds| ds.dims().iter().map(|d| (d.name.clone(), d.len)).collect())
                    .unwrap_or_default(),
                error: self.error(&r.key).map(str::to_string),
            })
            .collect()
    }
}
