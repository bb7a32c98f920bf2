//! Run episode pipelines concurrently on a fixed number of worker slots.
//!
//! Keeps up to `capacity` pipelines in flight; as soon as one finishes the
//! next queued episode starts, whatever stage the others are in.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use crate::control::RunContext;
use crate::episode::Episode;
use crate::error::HarvestError;
use crate::orchestrator::{run_episode, AttemptPolicy, EpisodeOutcome, EpisodeReport, Toolkit};

/// Runs every episode to a terminal outcome and returns one report per episode,
/// in completion order. Episodes still queued when the stop signal fires are
/// reported as interrupted without being started.
pub async fn run_episodes(
    episodes: Vec<Episode>,
    toolkit: Arc<Toolkit>,
    policy: AttemptPolicy,
    out_dir: PathBuf,
    ctx: RunContext,
) -> Vec<EpisodeReport> {
    let mut queue: VecDeque<Episode> = episodes.into();
    let mut reports = Vec::with_capacity(queue.len());
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        while !ctx.is_cancelled() && !queue.is_empty() {
            let Some(slot) = ctx.slots().try_claim() else {
                break;
            };
            let Some(episode) = queue.pop_front() else {
                break;
            };
            let toolkit = Arc::clone(&toolkit);
            let out_dir = out_dir.clone();
            let ctx = ctx.clone();
            join_set.spawn(async move {
                let _slot = slot;
                let fallback = EpisodeReport::new(&episode, EpisodeOutcome::Interrupted, Vec::new());
                // Inner task so a panicking collaborator still yields a report.
                match tokio::spawn(run_episode(episode, out_dir, toolkit, policy, ctx)).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(episode = fallback.number, error = %e, "episode task died");
                        EpisodeReport {
                            outcome: EpisodeOutcome::Failed(HarvestError::Internal(e.to_string())),
                            ..fallback
                        }
                    }
                }
            });
        }

        if join_set.is_empty() {
            break;
        }
        match join_set.join_next().await {
            Some(Ok(report)) => reports.push(report),
            Some(Err(e)) => tracing::error!(error = %e, "episode worker join failed"),
            None => break,
        }
    }

    if !queue.is_empty() {
        tracing::info!(skipped = queue.len(), "stop requested, queued episodes not started");
    }
    reports.extend(queue.iter().map(EpisodeReport::interrupted));
    reports
}
