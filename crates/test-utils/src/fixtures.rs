//! Common test fixtures for acquisition tests.
//!
//! Catalog and credential responses shaped like the real services return
//! them, plus a few reusable query extents.

use serde_json::{json, Value};

/// Common bounding box definitions for testing, as (west, south, east, north).
pub mod bbox {
    /// Global bounding box
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// Small box over the Chesapeake Bay
    pub const CHESAPEAKE: (f64, f64, f64, f64) = (-76.6, 38.8, -76.5, 38.9);

    /// Continental United States
    pub const CONUS: (f64, f64, f64, f64) = (-130.0, 20.0, -60.0, 55.0);

    /// Invalid bbox (west > east)
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 10.0, 5.0, 5.0);
}

/// Common time values for testing.
pub mod time {
    pub const START_DATE: &str = "2023-01-01";
    pub const END_DATE: &str = "2023-01-05";
    pub const START_TIME: &str = "2023-01-01T00:00:00Z";
    pub const END_TIME: &str = "2023-01-05T00:00:00Z";
}

/// Provider ids as they appear in catalog metadata.
pub mod providers {
    pub const GES_DISC: &str = "GES_DISC";
    pub const POCLOUD: &str = "POCLOUD";
    pub const LPDAAC: &str = "LPDAAC";
}

/// One UMM JSON granule hit.
///
/// The first related URL carries the file name, the second is the data URL.
pub fn umm_hit(file_name: &str, data_url: &str, provider: &str) -> Value {
    json!({
        "meta": {
            "provider-id": provider,
            "concept-id": format!("G-{}", file_name),
        },
        "umm": {
            "RelatedUrls": [
                {"URL": format!("https://search.earthdata.nasa.gov/granules/{}", file_name), "Type": "GET DATA"},
                {"URL": data_url, "Type": "GET DATA VIA DIRECT ACCESS"}
            ],
            "TemporalExtent": {
                "RangeDateTime": {
                    "BeginningDateTime": "2023-01-01T00:00:00.000Z",
                    "EndingDateTime": "2023-01-01T23:59:59.999Z"
                }
            },
            "SpatialExtent": {
                "HorizontalSpatialDomain": {
                    "Geometry": {
                        "BoundingRectangles": [{
                            "WestBoundingCoordinate": -180.0,
                            "EastBoundingCoordinate": 180.0,
                            "NorthBoundingCoordinate": 90.0,
                            "SouthBoundingCoordinate": -90.0
                        }]
                    }
                }
            },
            "DataGranule": {"DayNightFlag": "Unspecified"}
        }
    })
}

/// Hit for `s3://{bucket}/{file_name}`.
pub fn s3_hit(bucket: &str, file_name: &str, provider: &str) -> Value {
    umm_hit(file_name, &format!("s3://{}/{}", bucket, file_name), provider)
}

/// A page of hits.
pub fn catalog_page(hits: Vec<Value>) -> Value {
    json!({
        "hits": hits.len(),
        "took": 12,
        "items": hits,
    })
}

/// A page with zero hits, which ends pagination.
pub fn empty_page() -> Value {
    catalog_page(Vec::new())
}

/// A temporary-credential response from a provider's credential endpoint.
pub fn credential_response(access_key_id: &str) -> Value {
    json!({
        "accessKeyId": access_key_id,
        "secretAccessKey": format!("{}-secret", access_key_id),
        "sessionToken": format!("{}-token", access_key_id),
        "expiration": "2023-01-01 01:00:00+00:00",
    })
}
