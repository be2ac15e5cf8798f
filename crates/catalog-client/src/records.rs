//! Granule records extracted from catalog (UMM JSON) responses.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, CatalogResult};

/// One granule hit from the catalog, keyed by its file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_name: String,
    /// Direct data URL (second related URL of the granule).
    pub file_url: String,
    pub provider_id: String,
    /// `TemporalExtent.RangeDateTime`, kept as returned.
    pub temporal_range: Value,
    /// `SpatialExtent.HorizontalSpatialDomain`, kept as returned.
    pub spatial_extent: Value,
    pub day_night_flag: String,
}

/// Accumulated, deduplicated search hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    /// file name -> record; first-seen record wins.
    pub records: BTreeMap<String, FileRecord>,
    /// Provider id observed on the first successful page.
    pub provider_id: Option<String>,
}

impl SearchResult {
    /// Merge one page of records. Returns how many were new.
    pub fn absorb(&mut self, page: Vec<FileRecord>) -> usize {
        let mut added = 0;
        for record in page {
            match &self.provider_id {
                None => self.provider_id = Some(record.provider_id.clone()),
                Some(provider) if *provider != record.provider_id => {
                    tracing::warn!(
                        expected = %provider,
                        found = %record.provider_id,
                        file = %record.file_name,
                        "Catalog hit from a different provider"
                    );
                }
                Some(_) => {}
            }

            if !self.records.contains_key(&record.file_name) {
                self.records.insert(record.file_name.clone(), record);
                added += 1;
            }
        }
        added
    }

    /// Sorted, deduplicated data URLs.
    pub fn file_addresses(&self) -> BTreeSet<String> {
        self.records.values().map(|r| r.file_url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// UMM JSON wire shapes. Every field is required: a missing one fails the hit,
// and a failing hit fails the page.

#[derive(Deserialize)]
struct UmmHit {
    meta: UmmMeta,
    umm: UmmGranule,
}

#[derive(Deserialize)]
struct UmmMeta {
    #[serde(rename = "provider-id")]
    provider_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UmmGranule {
    related_urls: Vec<RelatedUrl>,
    temporal_extent: TemporalExtent,
    spatial_extent: SpatialExtent,
    data_granule: DataGranule,
}

#[derive(Deserialize)]
struct RelatedUrl {
    #[serde(rename = "URL")]
    url: String,
}

#[derive(Deserialize)]
struct TemporalExtent {
    #[serde(rename = "RangeDateTime")]
    range_date_time: Value,
}

#[derive(Deserialize)]
struct SpatialExtent {
    #[serde(rename = "HorizontalSpatialDomain")]
    horizontal_spatial_domain: Value,
}

#[derive(Deserialize)]
struct DataGranule {
    #[serde(rename = "DayNightFlag")]
    day_night_flag: String,
}

/// Pull the `items` list out of a page body.
pub(crate) fn page_items(page: u32, body: &Value) -> CatalogResult<&Vec<Value>> {
    body.get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::malformed(page, "response has no 'items' list"))
}

/// Parse every hit on a page. Any malformed hit fails the whole page.
pub(crate) fn parse_hits(page: u32, items: &[Value]) -> CatalogResult<Vec<FileRecord>> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_hit(item).map_err(|msg| {
            CatalogError::malformed(page, format!("items[{}]: {}", idx, msg))
        }))
        .collect()
}

fn parse_hit(item: &Value) -> Result<FileRecord, String> {
    let hit = UmmHit::deserialize(item).map_err(|e| e.to_string())?;
    let mut urls = hit.umm.related_urls.into_iter();

    let first = urls.next().ok_or("RelatedUrls is empty")?;
    let file_name = first
        .url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| format!("cannot derive a file name from '{}'", first.url))?
        .to_string();

    let file_url = urls
        .next()
        .ok_or("RelatedUrls has no data URL at position 1")?
        .url;

    Ok(FileRecord {
        file_name,
        file_url,
        provider_id: hit.meta.provider_id,
        temporal_range: hit.umm.temporal_extent.range_date_time,
        spatial_extent: hit.umm.spatial_extent.horizontal_spatial_domain,
        day_night_flag: hit.umm.data_granule.day_night_flag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(first: &str, second: &str, provider: &str) -> Value {
        json!({
            "meta": {"provider-id": provider},
            "umm": {
                "RelatedUrls": [{"URL": first}, {"URL": second}],
                "TemporalExtent": {"RangeDateTime": "temporal_range1"},
                "DataGranule": {"DayNightFlag": "day_night1"},
                "SpatialExtent": {"HorizontalSpatialDomain": "spatial_extent1"}
            }
        })
    }

    #[test]
    fn test_parse_hit_fields() {
        let items = vec![hit("https://h/path/url1", "url2", "provider1")];
        let records = parse_hits(1, &items).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.file_name, "url1");
        assert_eq!(r.file_url, "url2");
        assert_eq!(r.provider_id, "provider1");
        assert_eq!(r.temporal_range, json!("temporal_range1"));
        assert_eq!(r.spatial_extent, json!("spatial_extent1"));
        assert_eq!(r.day_night_flag, "day_night1");
    }

    #[test]
    fn test_missing_field_fails_page() {
        let mut broken = hit("a/f1.nc", "s3://b/f1.nc", "P");
        broken["umm"].as_object_mut().unwrap().remove("DataGranule");
        let items = vec![hit("a/f0.nc", "s3://b/f0.nc", "P"), broken];

        let err = parse_hits(4, &items).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { page: 4, .. }));
        assert!(err.to_string().contains("items[1]"));
    }

    #[test]
    fn test_single_related_url_is_malformed() {
        let mut item = hit("a/f.nc", "b", "P");
        item["umm"]["RelatedUrls"] = json!([{"URL": "a/f.nc"}]);
        assert!(parse_hits(1, &[item]).is_err());
    }

    #[test]
    fn test_missing_items_is_malformed() {
        let body = json!({"hits": 3});
        assert!(page_items(2, &body).is_err());
    }

    #[test]
    fn test_absorb_keeps_first_seen() {
        let mut result = SearchResult::default();
        let first = parse_hits(1, &[hit("x/f.nc", "s3://b/first.nc", "P")]).unwrap();
        let second = parse_hits(2, &[hit("y/f.nc", "s3://b/second.nc", "P")]).unwrap();

        assert_eq!(result.absorb(first), 1);
        assert_eq!(result.absorb(second), 0);
        assert_eq!(result.len(), 1);
        assert_eq!(result.records["f.nc"].file_url, "s3://b/first.nc");
        assert_eq!(result.provider_id.as_deref(), Some("P"));
    }
}
