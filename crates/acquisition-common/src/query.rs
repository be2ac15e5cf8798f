//! Catalog search query types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AcqResult, AcquisitionError};
use crate::time::TemporalRange;

/// Default number of hits requested per catalog page.
pub const DEFAULT_PAGE_SIZE: u32 = 150;

/// Default upper bound on the number of pages walked per search.
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Name of the spatial parameter sent to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialParameter {
    BoundingBox,
    Point,
    Polygon,
}

impl SpatialParameter {
    /// Catalog query parameter name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoundingBox => "bounding_box",
            Self::Point => "point",
            Self::Polygon => "polygon",
        }
    }

    fn check_arity(&self, len: usize) -> Result<(), String> {
        match self {
            Self::BoundingBox if len != 4 => {
                Err(format!("bounding_box needs 4 values, got {}", len))
            }
            Self::Point if len != 2 => Err(format!("point needs 2 values, got {}", len)),
            Self::Polygon if len < 6 || len % 2 != 0 => Err(format!(
                "polygon needs an even number of values (at least 6), got {}",
                len
            )),
            _ => Ok(()),
        }
    }
}

impl FromStr for SpatialParameter {
    type Err = AcquisitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bounding_box" | "bbox" => Ok(Self::BoundingBox),
            "point" => Ok(Self::Point),
            "polygon" => Ok(Self::Polygon),
            other => Err(AcquisitionError::InvalidParameter {
                param: "spatial_parameter".to_string(),
                message: format!("unknown spatial parameter '{}'", other),
            }),
        }
    }
}

impl fmt::Display for SpatialParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spatial filter: parameter name plus its numeric values (lon/lat order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFilter {
    pub parameter: SpatialParameter,
    pub values: Vec<f64>,
}

impl SpatialFilter {
    pub fn new(parameter: SpatialParameter, values: Vec<f64>) -> AcqResult<Self> {
        parameter
            .check_arity(values.len())
            .map_err(AcquisitionError::InvalidSpatialFilter)?;

        if values.iter().any(|v| !v.is_finite()) {
            return Err(AcquisitionError::InvalidSpatialFilter(
                "values must be finite".to_string(),
            ));
        }

        Ok(Self { parameter, values })
    }

    /// `(min_lon, min_lat, max_lon, max_lat)`
    pub fn bounding_box(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> AcqResult<Self> {
        Self::new(
            SpatialParameter::BoundingBox,
            vec![min_lon, min_lat, max_lon, max_lat],
        )
    }

    pub fn point(lon: f64, lat: f64) -> AcqResult<Self> {
        Self::new(SpatialParameter::Point, vec![lon, lat])
    }

    /// Polygon ring as `(lon, lat)` pairs; the ring should be closed and counter-clockwise.
    pub fn polygon(ring: &[(f64, f64)]) -> AcqResult<Self> {
        let values = ring.iter().flat_map(|&(lon, lat)| [lon, lat]).collect();
        Self::new(SpatialParameter::Polygon, values)
    }

    /// Comma-joined value string sent as the parameter value.
    pub fn to_param_value(&self) -> String {
        self.values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A collection/spatial/temporal search against the metadata catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Collection short name (mission).
    pub short_name: String,
    pub temporal: TemporalRange,
    pub spatial: SpatialFilter,
    /// Optional day/night filter; sent empty when unset.
    #[serde(default)]
    pub day_night_flag: Option<String>,
    pub page_size: u32,
    pub max_pages: u32,
}

impl SearchQuery {
    pub fn new(
        short_name: impl Into<String>,
        temporal: TemporalRange,
        spatial: SpatialFilter,
    ) -> Self {
        Self {
            short_name: short_name.into(),
            temporal,
            spatial,
            day_night_flag: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_day_night_flag(mut self, flag: impl Into<String>) -> Self {
        self.day_night_flag = Some(flag.into());
        self
    }

    /// Validate the invariants that can be broken after construction
    /// (public fields, deserialized input).
    pub fn validate(&self) -> AcqResult<()> {
        if self.short_name.trim().is_empty() {
            return Err(AcquisitionError::MissingParameter("short_name".to_string()));
        }
        if self.page_size == 0 {
            return Err(AcquisitionError::InvalidParameter {
                param: "page_size".to_string(),
                message: "must be > 0".to_string(),
            });
        }
        if self.max_pages == 0 {
            return Err(AcquisitionError::InvalidParameter {
                param: "max_pages".to_string(),
                message: "must be > 0".to_string(),
            });
        }
        if self.temporal.start > self.temporal.end {
            return Err(AcquisitionError::InvalidTemporalRange(
                "start is after end".to_string(),
            ));
        }
        self.spatial
            .parameter
            .check_arity(self.spatial.values.len())
            .map_err(AcquisitionError::InvalidSpatialFilter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temporal() -> TemporalRange {
        TemporalRange::from_dates("2019-05-18", "2019-06-18").unwrap()
    }

    #[test]
    fn test_spatial_arity() {
        assert!(SpatialFilter::bounding_box(-76.6, 38.8, -76.5, 38.9).is_ok());
        assert!(SpatialFilter::point(-76.6, 38.8).is_ok());
        assert!(SpatialFilter::new(SpatialParameter::Point, vec![1.0]).is_err());
        assert!(SpatialFilter::new(SpatialParameter::BoundingBox, vec![1.0, 2.0]).is_err());
        assert!(SpatialFilter::new(SpatialParameter::Polygon, vec![1.0; 4]).is_err());
        assert!(SpatialFilter::new(SpatialParameter::Polygon, vec![1.0; 7]).is_err());
        assert!(SpatialFilter::new(SpatialParameter::Polygon, vec![1.0; 8]).is_ok());
    }

    #[test]
    fn test_polygon_flattening() {
        let ring = [(-80.6, 38.1), (-74.6, 38.2), (-75.5, 34.4), (-80.6, 38.1)];
        let filter = SpatialFilter::polygon(&ring).unwrap();
        assert_eq!(filter.values.len(), 8);
        assert_eq!(filter.to_param_value(), "-80.6,38.1,-74.6,38.2,-75.5,34.4,-80.6,38.1");
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(SpatialFilter::point(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_parameter_from_str() {
        assert_eq!(
            "BOUNDING_BOX".parse::<SpatialParameter>().unwrap(),
            SpatialParameter::BoundingBox
        );
        assert_eq!("point".parse::<SpatialParameter>().unwrap(), SpatialParameter::Point);
        assert!("circle".parse::<SpatialParameter>().is_err());
    }

    #[test]
    fn test_query_defaults_and_validation() {
        let query = SearchQuery::new(
            "GLDAS_NOAH025_3H",
            temporal(),
            SpatialFilter::point(-76.6, 38.8).unwrap(),
        );
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(query.max_pages, DEFAULT_MAX_PAGES);
        assert!(query.validate().is_ok());

        assert!(query.clone().with_page_size(0).validate().is_err());
        assert!(query.clone().with_max_pages(0).validate().is_err());

        let mut blank = query;
        blank.short_name = "  ".to_string();
        assert!(matches!(
            blank.validate(),
            Err(AcquisitionError::MissingParameter(_))
        ));
    }
}
