//! Artifact GET: the seam between the downloader and the network.

use crate::artifact::ArtifactKey;
use crate::error::TransferError;
use crate::http::{self, Response, Timeouts};

/// Fetches the bytes of one artifact. Blocking; called from the blocking pool.
pub trait ArtifactFetcher: Send + Sync + 'static {
    fn fetch(&self, key: &ArtifactKey) -> Result<Response, TransferError>;
}

/// Fetches `<base_url><remote key>` with libcurl; absolute remote keys are fetched as-is.
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    base_url: String,
}

impl CurlFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, key: &ArtifactKey) -> String {
        if url::Url::parse(&key.remote).is_ok() {
            key.remote.clone()
        } else if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, key.remote)
        } else {
            format!("{}/{}", self.base_url, key.remote)
        }
    }
}

impl ArtifactFetcher for CurlFetcher {
    fn fetch(&self, key: &ArtifactKey) -> Result<Response, TransferError> {
        let url = self.url_for(key);
        tracing::debug!(%url, "artifact GET");
        http::get(&url, &[], Timeouts::ARTIFACT)
    }
}
