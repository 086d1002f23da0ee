//! Single paginated query against the metadata API.

use crate::error::TransferError;
use crate::http::{self, Timeouts};

/// Sort field the walk depends on: newest `updated` first.
pub const SORT_BY_LAST_UPDATED: &str = "lastUpdatedDate";
pub const SORT_DESCENDING: &str = "descending";

/// Fixed header sent with every feed query.
const FEED_CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/json");

/// Parameters of one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Search filter expression, e.g. `cat:cs.AI`.
    pub search_query: String,
    pub sort_by: String,
    pub sort_order: String,
    /// Page size.
    pub max_results: usize,
    /// Offset of the first record on the page.
    pub start: usize,
}

impl FeedQuery {
    /// Newest-first query for `search_query` at `start`.
    pub fn newest_first(search_query: &str, max_results: usize, start: usize) -> Self {
        Self {
            search_query: search_query.to_string(),
            sort_by: SORT_BY_LAST_UPDATED.to_string(),
            sort_order: SORT_DESCENDING.to_string(),
            max_results,
            start,
        }
    }

    /// Full request URL against `api_url`.
    pub fn to_url(&self, api_url: &str) -> Result<url::Url, url::ParseError> {
        url::Url::parse_with_params(
            api_url,
            &[
                ("search_query", self.search_query.clone()),
                ("sortBy", self.sort_by.clone()),
                ("sortOrder", self.sort_order.clone()),
                ("max_results", self.max_results.to_string()),
                ("start", self.start.to_string()),
            ],
        )
    }
}

/// Blocking client for the query API.
#[derive(Debug, Clone)]
pub struct FeedClient {
    api_url: String,
}

impl FeedClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    /// Fetch one page and return the raw response body. No retries.
    pub fn fetch(&self, query: &FeedQuery) -> Result<Vec<u8>, TransferError> {
        let url = query.to_url(&self.api_url)?;
        tracing::debug!(url = %url, "feed query");
        let response = http::get(url.as_str(), &[FEED_CONTENT_TYPE], Timeouts::FEED)?;
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_url_carries_all_parameters() {
        let q = FeedQuery::newest_first("cat:cs.AI", 100, 300);
        let url = q.to_url("https://export.arxiv.org/api/query").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("search_query".to_string(), "cat:cs.AI".to_string()),
                ("sortBy".to_string(), "lastUpdatedDate".to_string()),
                ("sortOrder".to_string(), "descending".to_string()),
                ("max_results".to_string(), "100".to_string()),
                ("start".to_string(), "300".to_string()),
            ]
        );
        assert_eq!(url.path(), "/api/query");
    }

    #[test]
    fn query_url_rejects_bad_base() {
        let q = FeedQuery::newest_first("cat:cs.AI", 10, 0);
        assert!(q.to_url("not a url").is_err());
    }
}
