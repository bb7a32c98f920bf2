//! One harvest run: discover, schedule every episode, summarize.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::control::RunContext;
use crate::discovery::{build_episodes, DiscoveryRequest, EpisodeDiscovery};
use crate::downloader::temp_root;
use crate::orchestrator::{AttemptPolicy, Toolkit};
use crate::scheduler::run_episodes;
use crate::summary::RunSummary;

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub out_dir: PathBuf,
    pub target_width: u32,
    /// Episodes numbered below this are skipped.
    pub start_episode: u32,
    pub max_candidate_attempts: Option<usize>,
    /// Remove the temp root under `out_dir` when the run ends.
    pub clean_temp: bool,
}

/// Runs a full harvest. Only setup problems (output dir, discovery) are errors;
/// per-episode outcomes are in the returned summary.
pub async fn harvest(
    discovery: &dyn EpisodeDiscovery,
    request: &DiscoveryRequest,
    opts: &HarvestOptions,
    toolkit: Arc<Toolkit>,
    ctx: RunContext,
) -> Result<RunSummary> {
    tokio::fs::create_dir_all(&opts.out_dir)
        .await
        .with_context(|| format!("create output dir {}", opts.out_dir.display()))?;

    let episodes = build_episodes(discovery, request, opts.start_episode)
        .await
        .context("discover episodes")?;
    if episodes.is_empty() {
        tracing::warn!("no episodes to process");
    }

    let policy = AttemptPolicy {
        target_width: opts.target_width,
        max_candidate_attempts: opts.max_candidate_attempts,
    };
    tracing::info!(
        episodes = episodes.len(),
        workers = ctx.slots().capacity(),
        target_width = opts.target_width,
        "harvest started"
    );
    let reports = run_episodes(episodes, toolkit, policy, opts.out_dir.clone(), ctx.clone()).await;

    if opts.clean_temp {
        let root = temp_root(&opts.out_dir);
        match tokio::fs::remove_dir_all(&root).await {
            Ok(()) => tracing::debug!(dir = %root.display(), "temp root removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(dir = %root.display(), error = %e, "could not remove temp root"),
        }
    }

    let summary = RunSummary::new(reports, ctx.is_cancelled());
    tracing::info!(
        verified = summary.verified_count(),
        failed = summary.failed_count(),
        interrupted = summary.interrupted_count(),
        peak_workers = ctx.slots().peak(),
        "harvest finished"
    );
    Ok(summary)
}
