//! `m3u8-harvest run` – harvest every episode of a listing.

use anyhow::Result;
use harvest_core::config::HarvestConfig;
use harvest_core::control::RunContext;
use harvest_core::discovery::{BrowserOptions, DiscoveryRequest, ManifestDiscovery};
use harvest_core::orchestrator::Toolkit;
use harvest_core::scheduler::EpisodeEvent;
use harvest_core::session::{harvest, HarvestOptions};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::RunArgs;

/// Builds the discovery request from the merged config.
pub(crate) fn discovery_request(cfg: &HarvestConfig, page_url: Option<String>) -> DiscoveryRequest {
    DiscoveryRequest {
        page_url,
        episode_selector: cfg.episode_selector.clone(),
        source_text: cfg.preferred_source().map(String::from),
        click_wait: cfg.click_wait(),
        browser: BrowserOptions {
            fast: cfg.fast,
            headless: cfg.headless,
            minimize: cfg.minimize,
            show_ui: cfg.show_ui,
        },
    }
}

pub async fn run_harvest(base: &HarvestConfig, args: RunArgs) -> Result<i32> {
    let cfg = args.apply(base);
    let out_dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let discovery = ManifestDiscovery::from_path(&args.manifest)?;
    let request = discovery_request(&cfg, args.url.clone());
    let opts = HarvestOptions {
        out_dir,
        target_width: cfg.target_width,
        start_episode: args.start_episode.max(1),
        max_candidate_attempts: cfg.max_candidate_attempts,
        clean_temp: cfg.clean_temp,
    };

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel::<EpisodeEvent>(64);
    let stop = CancellationToken::new();
    let ctx = RunContext::new(cfg.max_concurrent)
        .with_events(events_tx)
        .with_cancel(stop.clone());

    let signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStop requested, cancelling in-flight downloads...");
            tracing::warn!("ctrl-c received, cancelling run");
            stop.cancel();
        }
    });
    let progress_handle = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            println!("{}", event.describe());
        }
    });

    let toolkit = Arc::new(Toolkit::external(&cfg));
    let result = harvest(&discovery, &request, &opts, toolkit, ctx).await;

    signal_handle.abort();
    let _ = progress_handle.await;

    let summary = result?;
    println!();
    print!("{}", summary.render());
    Ok(summary.exit_status().code())
}
