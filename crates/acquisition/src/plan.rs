//! A set of collections to acquire over one region and time window.

use std::collections::BTreeMap;

use acquisition_common::{AcqResult, SearchQuery, SpatialFilter, TemporalRange};
use catalog_client::CatalogConfig;
use serde::{Deserialize, Serialize};

use crate::facade::AcquisitionSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionPlan {
    pub temporal: TemporalRange,
    pub spatial: SpatialFilter,
    /// Catalog collections, by short name.
    #[serde(default)]
    pub earthdata_collections: Vec<String>,
    /// Directly addressed Zarr stores: collection key → store path.
    #[serde(default)]
    pub custom_collections: BTreeMap<String, String>,
    #[serde(default)]
    pub day_night_flag: Option<String>,
}

impl AcquisitionPlan {
    pub fn new(temporal: TemporalRange, spatial: SpatialFilter) -> Self {
        Self {
            temporal,
            spatial,
            earthdata_collections: Vec::new(),
            custom_collections: BTreeMap::new(),
            day_night_flag: None,
        }
    }

    pub fn with_collection(mut self, short_name: impl Into<String>) -> Self {
        self.earthdata_collections.push(short_name.into());
        self
    }

    pub fn with_store(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.custom_collections.insert(key.into(), path.into());
        self
    }

    /// One request per collection: catalog collections first, then stores.
    ///
    /// Queries take page size and page limit from `catalog`.
    pub fn requests(&self, catalog: &CatalogConfig) -> AcqResult<Vec<(String, AcquisitionSource)>> {
        let mut requests = Vec::with_capacity(self.len());

        for short_name in &self.earthdata_collections {
            let mut query = SearchQuery::new(short_name.clone(), self.temporal, self.spatial.clone())
                .with_page_size(catalog.page_size)
                .with_max_pages(catalog.max_pages);
            if let Some(flag) = &self.day_night_flag {
                query = query.with_day_night_flag(flag.clone());
            }
            query.validate()?;
            requests.push((short_name.clone(), AcquisitionSource::Catalog(query)));
        }

        for (key, path) in &self.custom_collections {
            requests.push((key.clone(), AcquisitionSource::Store(path.clone())));
        }

        Ok(requests)
    }

    pub fn len(&self) -> usize {
        self.earthdata_collections.len() + self.custom_collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
