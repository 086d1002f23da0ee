use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::downloader::DEFAULT_CONCURRENCY;
use crate::feed::{ArxivFeed, ChemrxivFeed, FeedSource};

pub const DEFAULT_API_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_CHEMRXIV_URL: &str = "https://chemrxiv.org/engage/chemrxiv/public-api/v1/items";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://export.arxiv.org/e-print/";
pub const DEFAULT_SEARCH_QUERY: &str = "cat:cs.AI";
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Which feed the walk pages through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// arXiv Atom query API; e-prints fetched from `download_url`.
    #[default]
    Arxiv,
    /// ChemRxiv public items API; each item links its own asset.
    Chemrxiv,
}

impl SourceKind {
    /// Largest page the server returns in one response.
    pub fn max_page_size(self) -> usize {
        match self {
            SourceKind::Arxiv => 2000,
            SourceKind::Chemrxiv => 50,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Arxiv => f.write_str("arxiv"),
            SourceKind::Chemrxiv => f.write_str("chemrxiv"),
        }
    }
}

fn default_chemrxiv_url() -> String {
    DEFAULT_CHEMRXIV_URL.to_string()
}

/// Global configuration loaded from `~/.config/arxget/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArxgetConfig {
    /// Only records updated at or after this instant are downloaded.
    #[serde(default)]
    pub cutoff: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: SourceKind,
    /// Search filter expression sent as `search_query` (arXiv only).
    pub search_query: String,
    /// Records requested per page.
    pub page_size: usize,
    /// Maximum number of downloads in flight.
    pub concurrency: usize,
    /// Query API endpoint.
    pub api_url: String,
    /// E-print base URL; the artifact key is appended.
    pub download_url: String,
    /// ChemRxiv items endpoint.
    #[serde(default = "default_chemrxiv_url")]
    pub chemrxiv_url: String,
    /// Where artifacts are written (None = current directory).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for ArxgetConfig {
    fn default() -> Self {
        Self {
            cutoff: None,
            source: SourceKind::default(),
            search_query: DEFAULT_SEARCH_QUERY.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            api_url: DEFAULT_API_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            chemrxiv_url: default_chemrxiv_url(),
            output_dir: None,
        }
    }
}

/// Command-line (or environment) values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cutoff: Option<DateTime<Utc>>,
    pub source: Option<SourceKind>,
    pub search_query: Option<String>,
    pub page_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub api_url: Option<String>,
    pub download_url: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl ArxgetConfig {
    /// Layer `overrides` on top of this config.
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if overrides.cutoff.is_some() {
            self.cutoff = overrides.cutoff;
        }
        if let Some(k) = overrides.source {
            self.source = k;
        }
        if let Some(q) = overrides.search_query {
            self.search_query = q;
        }
        if let Some(n) = overrides.page_size {
            self.page_size = n;
        }
        if let Some(n) = overrides.concurrency {
            self.concurrency = n;
        }
        if let Some(u) = overrides.api_url {
            self.api_url = u;
        }
        if let Some(u) = overrides.download_url {
            self.download_url = u;
        }
        if overrides.output_dir.is_some() {
            self.output_dir = overrides.output_dir;
        }
        self
    }

    /// Check the values a walk depends on and return the cutoff.
    pub fn validate(&self) -> Result<DateTime<Utc>> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        let max = self.source.max_page_size();
        if self.page_size > max {
            anyhow::bail!(
                "page_size {} exceeds the {} limit of {} records per response",
                self.page_size,
                self.source,
                max
            );
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        match self.source {
            SourceKind::Arxiv => {
                if self.search_query.trim().is_empty() {
                    anyhow::bail!("search_query must not be empty");
                }
                url::Url::parse(&self.api_url)
                    .with_context(|| format!("invalid api_url {:?}", self.api_url))?;
                url::Url::parse(&self.download_url)
                    .with_context(|| format!("invalid download_url {:?}", self.download_url))?;
            }
            SourceKind::Chemrxiv => {
                url::Url::parse(&self.chemrxiv_url)
                    .with_context(|| format!("invalid chemrxiv_url {:?}", self.chemrxiv_url))?;
            }
        }
        self.cutoff
            .context("no cutoff given: pass --since, set ARXGET_SINCE, or set `cutoff` in config.toml")
    }

    /// The configured feed.
    pub fn feed_source(&self) -> Arc<dyn FeedSource> {
        match self.source {
            SourceKind::Arxiv => Arc::new(ArxivFeed::new(self.api_url.as_str(), self.search_query.as_str())),
            SourceKind::Chemrxiv => Arc::new(ChemrxivFeed::new(self.chemrxiv_url.as_str())),
        }
    }

    /// Output directory, defaulting to the current directory.
    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("arxget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ArxgetConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ArxgetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ArxgetConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
