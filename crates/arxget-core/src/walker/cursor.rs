//! Pagination state: offset, pages seen, and the stop decision.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{cutoff_index, Termination};
use crate::error::WalkError;
use crate::feed::{FeedSource, Page, Record};

/// Hands out the eligible records of one page at a time, in offset order.
pub struct PageCursor {
    source: Arc<dyn FeedSource>,
    cutoff: DateTime<Utc>,
    page_size: usize,
    offset: usize,
    pages_fetched: usize,
    termination: Option<Termination>,
}

impl PageCursor {
    pub fn new(source: Arc<dyn FeedSource>, cutoff: DateTime<Utc>, page_size: usize) -> Self {
        Self {
            source,
            cutoff,
            page_size: page_size.max(1),
            offset: 0,
            pages_fetched: 0,
            termination: None,
        }
    }

    /// Offset of the next page to fetch.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Termination reason; `EndOfFeed` if the cursor was never exhausted.
    pub fn finish(&self) -> Termination {
        self.termination.clone().unwrap_or(Termination::EndOfFeed)
    }

    /// Fetch the next page and return its eligible prefix, or `None` once stopped.
    ///
    /// The prefix may be empty (first record already older than the cutoff).
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>, WalkError> {
        if self.termination.is_some() {
            return Ok(None);
        }

        let offset = self.offset;
        let page_size = self.page_size;
        let source = Arc::clone(&self.source);
        let page = tokio::task::spawn_blocking(move || source.fetch_page(offset, page_size))
            .await
            .map_err(|e| WalkError::Join {
                offset,
                reason: e.to_string(),
            })??;
        self.pages_fetched += 1;

        let exhausted = self.is_last_page(&page);
        let mut records = page.records;
        let fetched = records.len();

        match cutoff_index(&records, self.cutoff) {
            Some(idx) => {
                let oldest = &records[idx];
                self.termination = Some(Termination::Cutoff {
                    record_id: oldest.id.clone(),
                    updated: oldest.updated,
                });
                records.truncate(idx);
            }
            None if exhausted => self.termination = Some(Termination::EndOfFeed),
            // Servers may cap a page below the requested size; resume right
            // after the last record actually received.
            None => self.offset += fetched,
        }

        tracing::debug!(
            offset,
            fetched,
            eligible = records.len(),
            done = self.termination.is_some(),
            "page scanned"
        );
        Ok(Some(records))
    }

    /// No further page can hold records.
    ///
    /// With a known total a short page only means the server capped it.
    fn is_last_page(&self, page: &Page) -> bool {
        if page.records.is_empty() {
            return true;
        }
        match page.total_results {
            Some(total) => (self.offset + page.records.len()) as u64 >= total,
            None => page.records.len() < self.page_size,
        }
    }
}
