//! Run plan file.
//!
//! ```yaml
//! title:
//!   title: Chesapeake SST
//! time_bounds:
//!   start: "2023-01-01"
//!   end: "2023-01-05"
//! bounds:
//!   - [-76.6, 38.8, -76.5, 38.9]
//! spatial_parameter: bounding_box
//! nasa_earthdata_collections:
//!   ids: [MUR-JPL-L4-GLOB-v4.1]
//! custom_collections:
//!   ids:
//!     chesapeake_model: s3://bucket/model.zarr
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use acquisition::AcquisitionPlan;
use acquisition_common::{SpatialFilter, SpatialParameter, TemporalRange};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Title {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collections {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomCollections {
    #[serde(default)]
    pub ids: BTreeMap<String, String>,
}

fn default_spatial_parameter() -> SpatialParameter {
    SpatialParameter::BoundingBox
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    #[serde(default)]
    pub title: Title,

    pub time_bounds: TimeBounds,

    /// Only the first entry is used.
    pub bounds: Vec<Vec<f64>>,

    #[serde(default = "default_spatial_parameter")]
    pub spatial_parameter: SpatialParameter,

    #[serde(default)]
    pub nasa_earthdata_collections: Collections,

    #[serde(default)]
    pub custom_collections: CustomCollections,

    #[serde(default)]
    pub day_night_flag: Option<String>,
}

impl RunPlan {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading run plan {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing run plan {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_acquisition_plan(&self) -> Result<AcquisitionPlan> {
        let temporal = TemporalRange::from_dates(&self.time_bounds.start, &self.time_bounds.end)?;
        let values = self
            .bounds
            .first()
            .ok_or_else(|| anyhow!("bounds must contain at least one entry"))?;
        let spatial = SpatialFilter::new(self.spatial_parameter, values.clone())?;

        let mut plan = AcquisitionPlan::new(temporal, spatial);
        plan.earthdata_collections = self.nasa_earthdata_collections.ids.clone();
        plan.custom_collections = self.custom_collections.ids.clone();
        plan.day_night_flag = self.day_night_flag.clone();
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
title:
  title: Chesapeake SST
time_bounds:
  start: "2023-01-01"
  end: "2023-01-05"
bounds:
  - [-76.6, 38.8, -76.5, 38.9]
nasa_earthdata_collections:
  ids: [MUR-JPL-L4-GLOB-v4.1, M2T1NXSLV]
custom_collections:
  ids:
    model: s3://bucket/model.zarr
"#;

    #[test]
    fn test_parse_plan() {
        let plan = RunPlan::from_yaml(PLAN).unwrap();
        assert_eq!(plan.title.title, "Chesapeake SST");
        assert_eq!(plan.spatial_parameter, SpatialParameter::BoundingBox);
        assert_eq!(plan.nasa_earthdata_collections.ids.len(), 2);
        assert_eq!(
            plan.custom_collections.ids.get("model").map(String::as_str),
            Some("s3://bucket/model.zarr")
        );
    }

    #[test]
    fn test_to_acquisition_plan() {
        let plan = RunPlan::from_yaml(PLAN).unwrap().to_acquisition_plan().unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.spatial.values, vec![-76.6, 38.8, -76.5, 38.9]);
        assert_eq!(plan.earthdata_collections[0], "MUR-JPL-L4-GLOB-v4.1");
    }

    #[test]
    fn test_point_plan() {
        let yaml = r#"
time_bounds: {start: "2023-01-01", end: "2023-01-02"}
bounds: [[-76.5, 38.9]]
spatial_parameter: point
"#;
        let plan = RunPlan::from_yaml(yaml).unwrap().to_acquisition_plan().unwrap();
        assert_eq!(plan.spatial.parameter, SpatialParameter::Point);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_invalid_plans() {
        let reversed = r#"
time_bounds: {start: "2023-02-01", end: "2023-01-01"}
bounds: [[-76.6, 38.8, -76.5, 38.9]]
"#;
        assert!(RunPlan::from_yaml(reversed).unwrap().to_acquisition_plan().is_err());

        let no_bounds = r#"
time_bounds: {start: "2023-01-01", end: "2023-01-02"}
bounds: []
"#;
        assert!(RunPlan::from_yaml(no_bounds).unwrap().to_acquisition_plan().is_err());

        let bad_arity = r#"
time_bounds: {start: "2023-01-01", end: "2023-01-02"}
bounds: [[1.0, 2.0, 3.0]]
"#;
        assert!(RunPlan::from_yaml(bad_arity).unwrap().to_acquisition_plan().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        std::fs::write(&path, PLAN).unwrap();

        assert!(RunPlan::load(&path).is_ok());
        assert!(RunPlan::load(dir.path().join("missing.yaml")).is_err());
    }
}
