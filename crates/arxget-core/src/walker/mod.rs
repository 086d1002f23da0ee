//! Cutoff walker: page through the newest-first feed until a record older
//! than the cutoff shows up, dispatching a download for every record before it.
//!
//! Boundary is inclusive: `updated == cutoff` is still downloaded. The walk
//! also ends on an exhausted feed (empty page, `totalResults` reached, or a
//! short page when the server sends no total). Each page starts right after
//! the last record received, so a server-capped page never opens a gap.

mod cursor;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::downloader::{DownloadReport, DownloadTask, Downloader};
use crate::error::WalkError;
use crate::feed::{FeedSource, Record};

pub use cursor::PageCursor;

/// Why the walk stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// A record older than the cutoff was reached.
    Cutoff {
        record_id: String,
        updated: DateTime<Utc>,
    },
    /// The feed ran out before the cutoff was reached.
    EndOfFeed,
}

/// Result of a completed walk with downloads.
#[derive(Debug)]
pub struct WalkReport {
    pub pages_fetched: usize,
    pub submitted: usize,
    pub termination: Termination,
    pub downloads: DownloadReport,
}

/// Result of a dry walk: the records a real walk would download.
#[derive(Debug, Clone)]
pub struct Listing {
    pub pages_fetched: usize,
    pub records: Vec<Record>,
    pub termination: Termination,
}

/// Index of the first record strictly older than `cutoff`, if any.
///
/// Records before it form the eligible prefix of the page.
pub fn cutoff_index(records: &[Record], cutoff: DateTime<Utc>) -> Option<usize> {
    records.iter().position(|r| r.updated < cutoff)
}

/// Drives pagination over a [`FeedSource`].
pub struct Walker {
    source: Arc<dyn FeedSource>,
    cutoff: DateTime<Utc>,
    page_size: usize,
}

impl Walker {
    /// `page_size` is clamped to at least 1.
    pub fn new(source: Arc<dyn FeedSource>, cutoff: DateTime<Utc>, page_size: usize) -> Self {
        Self {
            source,
            cutoff,
            page_size: page_size.max(1),
        }
    }

    fn cursor(&self) -> PageCursor {
        PageCursor::new(Arc::clone(&self.source), self.cutoff, self.page_size)
    }

    /// Walk the feed, submitting a download per eligible record, then drain.
    ///
    /// In-flight downloads are always drained, also when the walk fails; the
    /// error then names the stage and offset that stopped it.
    pub async fn run(&self, mut downloader: Downloader) -> Result<WalkReport, WalkError> {
        let mut cursor = self.cursor();
        let mut submitted = 0usize;

        let walked: Result<Termination, WalkError> = loop {
            let offset = cursor.offset();
            let eligible = match cursor.next_page().await {
                Ok(Some(records)) => records,
                Ok(None) => break Ok(cursor.finish()),
                Err(e) => break Err(e),
            };

            let mut failed = None;
            for record in eligible {
                match record.artifact_key() {
                    Ok(key) => {
                        downloader.submit(DownloadTask { key }).await;
                        submitted += 1;
                    }
                    Err(source) => {
                        failed = Some(source);
                        break;
                    }
                }
            }
            if let Some(source) = failed {
                break Err(WalkError::Parse { offset, source });
            }
        };

        let downloads = downloader.drain().await;
        match walked {
            Ok(termination) => {
                tracing::info!(
                    pages = cursor.pages_fetched(),
                    submitted,
                    ?termination,
                    "walk finished"
                );
                Ok(WalkReport {
                    pages_fetched: cursor.pages_fetched(),
                    submitted,
                    termination,
                    downloads,
                })
            }
            Err(e) => {
                tracing::error!(
                    stage = %e.stage(),
                    offset = e.offset(),
                    record = e.record_id().unwrap_or("-"),
                    saved = downloads.saved.len(),
                    failed = downloads.failed.len(),
                    "walk aborted: {}",
                    e
                );
                Err(e)
            }
        }
    }

    /// Walk without downloading; returns the records `run` would submit.
    pub async fn list(&self) -> Result<Listing, WalkError> {
        let mut cursor = self.cursor();
        let mut records = Vec::new();
        while let Some(eligible) = cursor.next_page().await? {
            records.extend(eligible);
        }
        Ok(Listing {
            pages_fetched: cursor.pages_fetched(),
            records,
            termination: cursor.finish(),
        })
    }
}
