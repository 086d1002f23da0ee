//! `arxget run` – walk the feed and download e-prints newer than the cutoff.

use anyhow::{Context, Result};
use arxget_core::config::ArxgetConfig;
use arxget_core::downloader::{CurlFetcher, Downloader};
use arxget_core::storage;
use arxget_core::walker::{Termination, Walker};
use std::sync::Arc;

pub async fn run_walk(cfg: &ArxgetConfig) -> Result<()> {
    let cutoff = cfg.validate()?;
    let output_dir = cfg.output_dir()?;
    storage::prepare_output_dir(&output_dir).context("output directory unusable")?;

    let source = cfg.feed_source();
    let fetcher = Arc::new(CurlFetcher::new(cfg.download_url.as_str()));
    let downloader = Downloader::new(fetcher, &output_dir, cfg.concurrency);
    let walker = Walker::new(source, cutoff, cfg.page_size);

    tracing::info!(
        source = %cfg.source,
        query = %cfg.search_query,
        %cutoff,
        page_size = cfg.page_size,
        concurrency = cfg.concurrency,
        dir = %output_dir.display(),
        "starting walk"
    );

    let report = walker
        .run(downloader)
        .await
        .with_context(|| format!("{} walk since {}", cfg.source, cutoff))?;

    match &report.termination {
        Termination::Cutoff { record_id, updated } => {
            println!("Reached cutoff at {} (updated {}).", record_id, updated.to_rfc3339());
        }
        Termination::EndOfFeed => println!("Reached end of feed."),
    }
    println!(
        "Downloaded {} of {} artifact(s) from {} page(s) into {}",
        report.downloads.saved.len(),
        report.submitted,
        report.pages_fetched,
        output_dir.display()
    );
    if !report.downloads.failed.is_empty() {
        eprintln!("{} download(s) failed:", report.downloads.failed.len());
        for failure in &report.downloads.failed {
            eprintln!("  {}", failure);
        }
    }
    Ok(())
}
