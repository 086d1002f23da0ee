//! `arxget list` – show what a run would download.

use anyhow::{Context, Result};
use arxget_core::config::ArxgetConfig;
use arxget_core::walker::{Termination, Walker};

pub async fn run_list(cfg: &ArxgetConfig) -> Result<()> {
    let cutoff = cfg.validate()?;
    let walker = Walker::new(cfg.feed_source(), cutoff, cfg.page_size);

    let listing = walker
        .list()
        .await
        .with_context(|| format!("{} listing since {}", cfg.source, cutoff))?;

    if listing.records.is_empty() {
        println!("No records updated since {}.", cutoff.to_rfc3339());
    } else {
        println!("{:<22} {:<22} {}", "UPDATED", "KEY", "TITLE");
        for r in &listing.records {
            let key = r
                .artifact_key()
                .map(|k| k.file_name.unwrap_or(k.remote))
                .unwrap_or_else(|_| r.id.clone());
            println!(
                "{:<22} {:<22} {}",
                r.updated.format("%Y-%m-%dT%H:%M:%SZ"),
                key,
                r.title
            );
        }
    }
    let stop = match &listing.termination {
        Termination::Cutoff { record_id, .. } => format!("cutoff at {record_id}"),
        Termination::EndOfFeed => "end of feed".to_string(),
    };
    println!(
        "{} record(s) over {} page(s); stopped: {}",
        listing.records.len(),
        listing.pages_fetched,
        stop
    );
    Ok(())
}
