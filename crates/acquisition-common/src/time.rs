//! Time handling for catalog queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AcqResult, AcquisitionError};

/// Format used by the catalog's `temporal` parameter (no offset, `Z` appended).
const CATALOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A closed time range for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TemporalRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AcqResult<Self> {
        if start > end {
            return Err(AcquisitionError::InvalidTemporalRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range from two `YYYY-MM-DD` strings.
    pub fn from_dates(start: &str, end: &str) -> AcqResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Render as the catalog `temporal` value: `"<startISO>Z,<endISO>Z"`.
    pub fn to_catalog_param(&self) -> String {
        format!(
            "{}Z,{}Z",
            self.start.format(CATALOG_TIME_FORMAT),
            self.end.format(CATALOG_TIME_FORMAT)
        )
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Parse a `YYYY-MM-DD` date as midnight UTC.
pub fn parse_date(s: &str) -> AcqResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        AcquisitionError::InvalidTime(format!("'{}': expected YYYY-MM-DD", s))
    })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AcquisitionError::InvalidTime(s.to_string()))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// Parse an ISO 8601 timestamp, falling back to a naive UTC time or a bare date.
pub fn parse_datetime(s: &str) -> AcqResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, CATALOG_TIME_FORMAT) {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    parse_date(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_param_format() {
        let range = TemporalRange::from_dates("2019-05-18", "2019-06-18").unwrap();
        assert_eq!(
            range.to_catalog_param(),
            "2019-05-18T00:00:00Z,2019-06-18T00:00:00Z"
        );
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = TemporalRange::from_dates("2020-01-02", "2020-01-01").unwrap_err();
        assert!(matches!(err, AcquisitionError::InvalidTemporalRange(_)));
    }

    #[test]
    fn test_single_instant_range_allowed() {
        let range = TemporalRange::from_dates("2020-01-01", "2020-01-01").unwrap();
        assert!(range.contains(parse_date("2020-01-01").unwrap()));
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        assert!(parse_date("01/02/2020").is_err());
        assert!(parse_date("2020-13-01").is_err());
    }

    #[test]
    fn test_parse_datetime_variants() {
        let a = parse_datetime("2024-01-15T12:00:00Z").unwrap();
        let b = parse_datetime("2024-01-15T12:00:00").unwrap();
        assert_eq!(a, b);
        let c = parse_datetime("2024-01-15").unwrap();
        assert_eq!(c.format("%H").to_string(), "00");
    }
}
