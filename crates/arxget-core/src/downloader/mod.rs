//! Bounded artifact downloader.
//!
//! At most `concurrency` tasks are in flight. `submit` waits for a free slot
//! (backpressure on the walker) and then returns while the fetch-and-save
//! runs on the blocking pool. `drain` waits for every admitted task and
//! collects per-task outcomes; a failed task never affects the others.

mod fetch;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::artifact::ArtifactKey;
use crate::error::TaskError;
use crate::storage;

pub use fetch::{ArtifactFetcher, CurlFetcher};

/// Default admission ceiling.
pub const DEFAULT_CONCURRENCY: usize = 25;

/// One artifact to fetch; handed over by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub key: ArtifactKey,
}

/// A successfully written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub key: ArtifactKey,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Outcome of every task admitted before `drain`.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub saved: Vec<SavedArtifact>,
    pub failed: Vec<TaskError>,
}

impl DownloadReport {
    pub fn total(&self) -> usize {
        self.saved.len() + self.failed.len()
    }
}

/// Executes download tasks under a fixed concurrency ceiling.
pub struct Downloader {
    fetcher: Arc<dyn ArtifactFetcher>,
    output_dir: Arc<PathBuf>,
    permits: Arc<Semaphore>,
    concurrency: usize,
    tasks: JoinSet<Result<SavedArtifact, TaskError>>,
    /// Keys admitted but not yet reported, with multiplicity.
    pending: HashMap<String, usize>,
    rejected: Vec<TaskError>,
}

impl Downloader {
    /// `concurrency` is clamped to at least 1.
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>, output_dir: impl Into<PathBuf>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            fetcher,
            output_dir: Arc::new(output_dir.into()),
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            tasks: JoinSet::new(),
            pending: HashMap::new(),
            rejected: Vec::new(),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Admit `task`, waiting while all slots are taken. Returns once the task is running.
    pub async fn submit(&mut self, task: DownloadTask) {
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(p) => p,
            Err(e) => {
                self.rejected.push(TaskError::Join {
                    key: task.key.remote,
                    reason: e.to_string(),
                });
                return;
            }
        };
        tracing::debug!(key = %task.key, "download admitted");
        *self.pending.entry(task.key.remote.clone()).or_default() += 1;

        let fetcher = Arc::clone(&self.fetcher);
        let dir = Arc::clone(&self.output_dir);
        self.tasks.spawn(async move {
            // Held until the blocking job returns, success or not.
            let _permit = permit;
            let key = task.key.remote.clone();
            let outcome = match tokio::task::spawn_blocking(move || {
                fetch_and_save(fetcher.as_ref(), &dir, task)
            })
            .await
            {
                Ok(res) => res,
                Err(e) => Err(TaskError::Join {
                    key,
                    reason: e.to_string(),
                }),
            };
            if let Err(e) = &outcome {
                tracing::warn!(key = e.key(), "{}", e);
            }
            outcome
        });
    }

    /// Wait for every admitted task and report what happened to each.
    ///
    /// A task that dies without reporting (panic outside the blocking job,
    /// runtime shutdown) is matched back to its key through the pending set.
    pub async fn drain(mut self) -> DownloadReport {
        let mut report = DownloadReport {
            saved: Vec::new(),
            failed: std::mem::take(&mut self.rejected),
        };
        let mut lost = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(saved)) => {
                    settle(&mut self.pending, &saved.key.remote);
                    report.saved.push(saved);
                }
                Ok(Err(e)) => {
                    settle(&mut self.pending, e.key());
                    report.failed.push(e);
                }
                Err(e) => lost.push(e.to_string()),
            }
        }
        let unreported = self
            .pending
            .drain()
            .flat_map(|(key, n)| std::iter::repeat(key).take(n));
        for (key, reason) in unreported.zip(lost) {
            tracing::warn!(%key, "download task lost: {}", reason);
            report.failed.push(TaskError::Join { key, reason });
        }
        tracing::info!(
            saved = report.saved.len(),
            failed = report.failed.len(),
            "downloads drained"
        );
        report
    }
}

fn settle(pending: &mut HashMap<String, usize>, key: &str) {
    if let Some(n) = pending.get_mut(key) {
        *n -= 1;
        if *n == 0 {
            pending.remove(key);
        }
    }
}

/// GET the artifact, name it from its content type, write it.
fn fetch_and_save(
    fetcher: &dyn ArtifactFetcher,
    dir: &Path,
    task: DownloadTask,
) -> Result<SavedArtifact, TaskError> {
    let response = fetcher
        .fetch(&task.key)
        .map_err(|source| TaskError::Transfer {
            key: task.key.remote.clone(),
            source,
        })?;

    tracing::debug!(
        key = %task.key,
        status = response.status,
        content_type = response.content_type.as_deref().unwrap_or("-"),
        "artifact fetched"
    );
    let name = task.key.local_name(response.content_type.as_deref());
    let path = storage::save_artifact(dir, &name, &response.body).map_err(|source| {
        TaskError::Storage {
            key: task.key.remote.clone(),
            source,
        }
    })?;

    tracing::info!(key = %task.key, path = %path.display(), "artifact saved");
    Ok(SavedArtifact {
        key: task.key,
        path,
        bytes: response.body.len() as u64,
    })
}
