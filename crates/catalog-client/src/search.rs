//! Paginated granule search.
//!
//! Pages are requested strictly in order; each one resolves to a tagged
//! [`PageOutcome`] and the loop decides whether to continue:
//!
//! ```text
//! page n ──► Page(records)   ──► absorb, request page n+1
//!        ──► Exhausted       ──► stop, Complete
//!        ──► TransportError  ──► n <= 2: Failed   | n > 2: stop, Complete
//!        ──► Malformed       ──► Failed
//! ```

use std::collections::BTreeSet;

use acquisition_common::SearchQuery;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::records::{page_items, parse_hits, FileRecord, SearchResult};

/// Transport errors on pages up to and including this one fail the search.
/// Later failures are read as the end of the result set.
pub const FATAL_PAGE_LIMIT: u32 = 2;

/// Outcome of a single page request.
#[derive(Debug)]
pub enum PageOutcome {
    /// The page had hits.
    Page(Vec<FileRecord>),
    /// The catalog reported zero hits.
    Exhausted,
    /// Connection failure or non-success status.
    TransportError(CatalogError),
    /// A hit was missing a required field.
    Malformed(CatalogError),
}

/// Outcome of a whole search.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Pagination ended normally (exhausted, page limit, or a late transport error).
    Complete(SearchResult),
    /// The search failed; `partial` holds whatever was accumulated first.
    Failed {
        partial: SearchResult,
        error: CatalogError,
    },
}

impl SearchOutcome {
    pub fn result(&self) -> &SearchResult {
        match self {
            Self::Complete(result) => result,
            Self::Failed { partial, .. } => partial,
        }
    }

    /// Sorted, deduplicated data URLs (partial on failure).
    pub fn file_addresses(&self) -> BTreeSet<String> {
        self.result().file_addresses()
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.result().provider_id.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn error(&self) -> Option<&CatalogError> {
        match self {
            Self::Complete(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// Convert to a `Result`, dropping the partial accumulation on failure.
    pub fn into_result(self) -> CatalogResult<SearchResult> {
        match self {
            Self::Complete(result) => Ok(result),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

/// Client for the catalog's granule search.
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    config: CatalogConfig,
}

impl SearchClient {
    /// Create a new client with the given configuration.
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CatalogError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create a client sharing an existing HTTP connection pool.
    pub fn with_client(client: Client, config: CatalogConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Walk pages `1..=max_pages` and accumulate deduplicated hits.
    #[instrument(skip(self, query), fields(short_name = %query.short_name, max_pages = query.max_pages))]
    pub async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        let mut result = SearchResult::default();

        if let Err(e) = query.validate() {
            return SearchOutcome::Failed {
                partial: result,
                error: CatalogError::InvalidQuery(e.to_string()),
            };
        }

        for page in 1..=query.max_pages {
            match self.fetch_page(query, page).await {
                PageOutcome::Page(records) => {
                    let hits = records.len();
                    let added = result.absorb(records);
                    debug!(page, hits, added, "Results found on page");
                }
                PageOutcome::Exhausted => {
                    debug!(page, "No hits on page, ending search");
                    break;
                }
                PageOutcome::TransportError(error) if page <= FATAL_PAGE_LIMIT => {
                    warn!(page, error = %error, "Catalog search failed");
                    return SearchOutcome::Failed {
                        partial: result,
                        error,
                    };
                }
                PageOutcome::TransportError(error) => {
                    warn!(page, error = %error, "Catalog error after several pages, treating as end of results");
                    break;
                }
                PageOutcome::Malformed(error) => {
                    warn!(page, error = %error, "Malformed catalog response");
                    return SearchOutcome::Failed {
                        partial: result,
                        error,
                    };
                }
            }
        }

        info!(
            files = result.len(),
            provider = ?result.provider_id,
            "Catalog search complete"
        );
        SearchOutcome::Complete(result)
    }

    /// Request and classify a single page.
    pub async fn fetch_page(&self, query: &SearchQuery, page: u32) -> PageOutcome {
        let params = build_request_params(query, page);

        let response = match self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return PageOutcome::TransportError(CatalogError::Transport {
                    page,
                    message: e.to_string(),
                })
            }
        };

        let status = response.status();
        if !status.is_success() {
            return PageOutcome::TransportError(CatalogError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_decode() => {
                return PageOutcome::Malformed(CatalogError::malformed(
                    page,
                    format!("body is not JSON: {}", e),
                ))
            }
            Err(e) => {
                return PageOutcome::TransportError(CatalogError::Transport {
                    page,
                    message: e.to_string(),
                })
            }
        };

        classify_page(page, &body)
    }
}

/// Classify a decoded page body.
pub fn classify_page(page: u32, body: &Value) -> PageOutcome {
    let items = match page_items(page, body) {
        Ok(items) => items,
        Err(e) => return PageOutcome::Malformed(e),
    };

    if items.is_empty() {
        return PageOutcome::Exhausted;
    }

    match parse_hits(page, items) {
        Ok(records) => PageOutcome::Page(records),
        Err(e) => PageOutcome::Malformed(e),
    }
}

/// Query parameters for one page request.
pub fn build_request_params(query: &SearchQuery, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("page_num", page.to_string()),
        ("page_size", query.page_size.to_string()),
        ("short_name", query.short_name.clone()),
        (query.spatial.parameter.as_str(), query.spatial.to_param_value()),
        (
            "day_night_flag",
            query.day_night_flag.clone().unwrap_or_default(),
        ),
        ("temporal", query.temporal.to_catalog_param()),
        ("online_only", "true".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquisition_common::{SpatialFilter, TemporalRange};
    use serde_json::json;

    fn query() -> SearchQuery {
        SearchQuery::new(
            "your_mission",
            TemporalRange::from_dates("2023-01-01", "2023-01-02").unwrap(),
            SpatialFilter::bounding_box(-76.6, 38.8, -76.5, 38.9).unwrap(),
        )
    }

    #[test]
    fn test_build_request_params() {
        let params = build_request_params(&query(), 2);
        let get = |k: &str| {
            params
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("page_num"), Some("2"));
        assert_eq!(get("page_size"), Some("150"));
        assert_eq!(get("short_name"), Some("your_mission"));
        assert_eq!(get("bounding_box"), Some("-76.6,38.8,-76.5,38.9"));
        assert_eq!(get("day_night_flag"), Some(""));
        assert_eq!(
            get("temporal"),
            Some("2023-01-01T00:00:00Z,2023-01-02T00:00:00Z")
        );
        assert_eq!(get("online_only"), Some("true"));
    }

    #[test]
    fn test_point_parameter_name() {
        let mut q = query();
        q.spatial = SpatialFilter::point(-76.6, 38.8).unwrap();
        let params = build_request_params(&q.with_day_night_flag("DAY"), 1);
        assert!(params.iter().any(|(k, v)| *k == "point" && v == "-76.6,38.8"));
        assert!(params.iter().any(|(k, v)| *k == "day_night_flag" && v == "DAY"));
        assert!(!params.iter().any(|(k, _)| *k == "bounding_box"));
    }

    #[test]
    fn test_classify_empty_page() {
        assert!(matches!(
            classify_page(1, &json!({"items": []})),
            PageOutcome::Exhausted
        ));
    }

    #[test]
    fn test_classify_missing_items() {
        assert!(matches!(
            classify_page(1, &json!({"errors": ["boom"]})),
            PageOutcome::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_query_fails_without_request() {
        let client = SearchClient::new(CatalogConfig::default().with_base_url("http://127.0.0.1:9"))
            .unwrap();
        let outcome = client.search(&query().with_max_pages(0)).await;
        assert!(matches!(
            outcome.error(),
            Some(CatalogError::InvalidQuery(_))
        ));
        assert!(outcome.file_addresses().is_empty());
    }
}
