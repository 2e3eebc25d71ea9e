//! `crawl`: run the harvest pipeline.

use anyhow::{Context, Result};
use harvester_core::{CrawlOptions, DataLayout, Harvester, HttpClient};
use tracing::info;

use crate::app_config::Settings;
use crate::cli::CrawlArgs;

pub async fn run_crawl_command(settings: &Settings, args: &CrawlArgs) -> Result<()> {
    // Unknown names fail here, before any request is made.
    let queries = settings.select_queries(&args.queries)?;

    let client = HttpClient::new(&settings.http).context("Failed to build HTTP client")?;
    let layout = DataLayout::new(&settings.data_dir);
    let harvester = Harvester::new(client, settings.service.clone(), layout);
    let options = CrawlOptions {
        full: args.full,
        start_page: args.offset,
        retry_unresolved: args.retry_unresolved,
    };

    info!(
        data_dir = %settings.data_dir.display(),
        queries = queries.len(),
        full = options.full,
        start_page = options.start_page,
        "Crawl starting"
    );
    let summary = harvester
        .run_until(&queries, options, interrupt_signal())
        .await?;

    let new_results: usize = summary.queries.iter().map(|(_, o)| o.new_results).sum();
    info!(
        new_results,
        check_uris = summary.check_uris,
        resolved = summary.resolve.checked,
        fetched = summary.documents.fetched,
        already_present = summary.documents.already_present,
        "Crawl complete"
    );
    Ok(())
}

/// Completes on Ctrl-C; never completes if the handler cannot be installed.
async fn interrupt_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
