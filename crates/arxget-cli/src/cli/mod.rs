//! CLI for arxget.

mod commands;

use anyhow::Result;
use arxget_core::config::{self, ArxgetConfig, Overrides, SourceKind};
use arxget_core::feed::parse_timestamp;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use commands::{run_completions, run_list, run_walk};

/// Top-level CLI for arxget.
#[derive(Debug, Parser)]
#[command(name = "arxget")]
#[command(about = "arxget: download every arXiv or ChemRxiv preprint updated since a cutoff", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Feed to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// arXiv query API (e-prints).
    Arxiv,
    /// ChemRxiv public items API.
    Chemrxiv,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Arxiv => SourceKind::Arxiv,
            SourceArg::Chemrxiv => SourceKind::Chemrxiv,
        }
    }
}

/// Options shared by every command that walks the feed.
#[derive(Debug, Clone, Default, Args)]
pub struct FeedArgs {
    /// Cutoff: records last updated before this RFC 3339 instant are not fetched.
    #[arg(long, env = "ARXGET_SINCE", value_name = "RFC3339", value_parser = parse_cutoff)]
    pub since: Option<DateTime<Utc>>,

    /// Feed to walk (default from config: arxiv).
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Search filter expression (e.g. "cat:cs.AI AND ti:planning").
    #[arg(long, conflicts_with = "category")]
    pub query: Option<String>,

    /// Shorthand for --query "cat:<CATEGORY>".
    #[arg(long)]
    pub category: Option<String>,

    /// Records requested per page.
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Override the query API endpoint.
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
}

impl FeedArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            cutoff: self.since,
            source: self.source.map(SourceKind::from),
            search_query: self
                .query
                .clone()
                .or_else(|| self.category.as_ref().map(|c| format!("cat:{c}"))),
            page_size: self.page_size,
            api_url: self.api_url.clone(),
            ..Overrides::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Walk the feed back to the cutoff and download every newer e-print.
    Run {
        #[command(flatten)]
        feed: FeedArgs,

        /// Maximum downloads in flight.
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Directory the artifacts are written to (default: current directory).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Override the e-print base URL.
        #[arg(long, value_name = "URL")]
        download_url: Option<String>,
    },

    /// Show the records a run would download, without downloading.
    List {
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                feed,
                concurrency,
                output_dir,
                download_url,
            } => {
                let cfg = resolve_config(Overrides {
                    concurrency,
                    output_dir,
                    download_url,
                    ..feed.overrides()
                })?;
                run_walk(&cfg).await?;
            }
            CliCommand::List { feed } => {
                let cfg = resolve_config(feed.overrides())?;
                run_list(&cfg).await?;
            }
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

/// Config file with command-line overrides applied.
fn resolve_config(overrides: Overrides) -> Result<ArxgetConfig> {
    let cfg = config::load_or_init()?.apply(overrides);
    tracing::debug!("effective config: {:?}", cfg);
    Ok(cfg)
}

fn parse_cutoff(s: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(s).map_err(|e| format!("expected an RFC 3339 timestamp like 2023-08-10T14:00:00Z: {e}"))
}

#[cfg(test)]
mod tests;
