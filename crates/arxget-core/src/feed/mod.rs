//! Metadata feed: records, pages, and the sources that produce them.
//!
//! The walker only sees [`FeedSource`]. [`ArxivFeed`] (query API client +
//! Atom parser) and [`ChemrxivFeed`] (public items API, JSON) are the
//! production implementations; tests plug in their own.

mod chemrxiv;
mod client;
mod parse;

use chrono::{DateTime, Utc};

use crate::artifact::ArtifactKey;
use crate::error::{ParseError, WalkError};

pub use chemrxiv::{parse_items, ChemrxivFeed, ChemrxivQuery, SORT_PUBLISHED_DESC};
pub use client::{FeedClient, FeedQuery, SORT_BY_LAST_UPDATED, SORT_DESCENDING};
pub use parse::{parse_feed, parse_timestamp};

/// One feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Entry identifier, e.g. `http://arxiv.org/abs/2308.07001v2`.
    pub id: String,
    pub updated: DateTime<Utc>,
    pub published: Option<DateTime<Utc>>,
    pub title: String,
    /// Download location when the feed links the asset itself.
    pub artifact: Option<ArtifactKey>,
}

impl Record {
    /// Where to fetch this record's artifact: the linked asset, or a key derived from `id`.
    pub fn artifact_key(&self) -> Result<ArtifactKey, ParseError> {
        match &self.artifact {
            Some(key) => Ok(key.clone()),
            None => ArtifactKey::from_record_id(&self.id),
        }
    }
}

/// One batch of records, newest `updated` first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub records: Vec<Record>,
    /// `opensearch:totalResults`, when the server sends it.
    pub total_results: Option<u64>,
}

/// Anything that can produce the newest-first page at a given offset.
///
/// Blocking; the walker calls it from the blocking pool.
pub trait FeedSource: Send + Sync {
    fn fetch_page(&self, offset: usize, page_size: usize) -> Result<Page, WalkError>;
}

/// Query API client plus Atom parser.
#[derive(Debug, Clone)]
pub struct ArxivFeed {
    client: FeedClient,
    search_query: String,
}

impl ArxivFeed {
    pub fn new(api_url: impl Into<String>, search_query: impl Into<String>) -> Self {
        Self {
            client: FeedClient::new(api_url),
            search_query: search_query.into(),
        }
    }
}

impl FeedSource for ArxivFeed {
    fn fetch_page(&self, offset: usize, page_size: usize) -> Result<Page, WalkError> {
        let query = FeedQuery::newest_first(&self.search_query, page_size, offset);
        let raw = self
            .client
            .fetch(&query)
            .map_err(|source| WalkError::Fetch { offset, source })?;
        parse_feed(&raw).map_err(|source| WalkError::Parse { offset, source })
    }
}
