//! Error taxonomy for the walk and for individual download tasks.
//!
//! Walk-level errors (`WalkError`) abort pagination; task-level errors
//! (`TaskError`) are isolated to the artifact that raised them.

use std::fmt;
use std::path::PathBuf;

/// Failure of a single HTTP transfer (feed page or artifact GET).
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, DNS, etc.).
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// Request URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
}

/// A feed page could not be decoded into records.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed feed document: {0}")]
    Xml(String),
    #[error("malformed items document: {0}")]
    Json(#[from] serde_json::Error),
    /// The API answered with an error entry instead of results.
    #[error("query rejected by the API ({id}): {message}")]
    Api { id: String, message: String },
    #[error("entry is missing <{0}>")]
    MissingField(&'static str),
    #[error("entry {id}: invalid timestamp {value:?}: {source}")]
    Timestamp {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("entry id {0:?} has no usable artifact key")]
    Identifier(String),
}

impl ParseError {
    /// Record id the error is attributed to, when it is known.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            ParseError::Timestamp { id, .. } => Some(id),
            ParseError::Identifier(id) | ParseError::Api { id, .. } => Some(id),
            ParseError::Xml(_) | ParseError::Json(_) | ParseError::MissingField(_) => None,
        }
    }
}

/// Artifact bytes could not be persisted.
#[derive(Debug, thiserror::Error)]
#[error("cannot write {}: {source}", path.display())]
pub struct StorageError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Pipeline stage a fatal walk error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Parse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => f.write_str("fetch"),
            Stage::Parse => f.write_str("parse"),
        }
    }
}

/// Fatal walk error. Carries the page offset so a later run can restart there.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("fetch of page at offset {offset} failed")]
    Fetch {
        offset: usize,
        #[source]
        source: TransferError,
    },
    #[error("parse of page at offset {offset} failed")]
    Parse {
        offset: usize,
        #[source]
        source: ParseError,
    },
    #[error("feed worker for offset {offset} did not complete: {reason}")]
    Join { offset: usize, reason: String },
}

impl WalkError {
    pub fn stage(&self) -> Stage {
        match self {
            WalkError::Fetch { .. } | WalkError::Join { .. } => Stage::Fetch,
            WalkError::Parse { .. } => Stage::Parse,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            WalkError::Fetch { offset, .. }
            | WalkError::Parse { offset, .. }
            | WalkError::Join { offset, .. } => *offset,
        }
    }

    /// Id of the record that triggered the failure, if the stage could name one.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            WalkError::Parse { source, .. } => source.record_id(),
            _ => None,
        }
    }
}

/// Why a single download task failed. Never aborts the walk.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("download of {key} failed: {source}")]
    Transfer {
        key: String,
        #[source]
        source: TransferError,
    },
    #[error("saving {key} failed: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },
    #[error("task for {key} did not complete: {reason}")]
    Join { key: String, reason: String },
}

impl TaskError {
    pub fn key(&self) -> &str {
        match self {
            TaskError::Transfer { key, .. }
            | TaskError::Storage { key, .. }
            | TaskError::Join { key, .. } => key,
        }
    }
}
