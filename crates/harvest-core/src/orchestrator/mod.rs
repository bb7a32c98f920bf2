//! Retry orchestrator: one episode, ranked candidates, three escalating checks.
//!
//! Candidates are tried strictly in ranked order. Each goes through the fast
//! probe, the full download and the final verification; a failure at any
//! stage moves on to the next candidate and never repeats the same one. The
//! episode ends verified, exhausted, or interrupted by the run's stop signal.

mod report;
mod stage;

#[cfg(test)]
pub(crate) mod fakes;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::HarvestConfig;
use crate::control::RunContext;
use crate::downloader::{DownloadRequest, Downloader, ExternalDownloader};
use crate::episode::Episode;
use crate::error::HarvestError;
use crate::probe::{PlaylistProber, Prober};
use crate::scheduler::EventKind;
use crate::source::{rank, SourceCandidate};
use crate::verify::{FfprobeVerifier, FinalVerifier};

pub use report::{CandidateAttempt, EpisodeOutcome, EpisodeReport};
pub use stage::{CandidateCursor, Stage, Transition};

/// The three collaborators an episode pipeline drives.
#[derive(Clone)]
pub struct Toolkit {
    pub prober: Arc<dyn Prober>,
    pub downloader: Arc<dyn Downloader>,
    pub verifier: Arc<dyn FinalVerifier>,
}

impl Toolkit {
    /// Real implementations backed by libcurl, N_m3u8DL-RE, ffmpeg and ffprobe.
    pub fn external(cfg: &HarvestConfig) -> Self {
        Self {
            prober: Arc::new(PlaylistProber::new(cfg.probe.clone(), &cfg.tools)),
            downloader: Arc::new(ExternalDownloader::new(&cfg.tools, cfg.clean_temp)),
            verifier: Arc::new(FfprobeVerifier::new(&cfg.tools, &cfg.verify)),
        }
    }
}

/// Per-run acceptance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    pub target_width: u32,
    pub max_candidate_attempts: Option<usize>,
}

async fn remove_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed unverified output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove unverified output"),
    }
}

struct Pipeline<'a> {
    number: u32,
    candidates: &'a [SourceCandidate],
    output_path: &'a Path,
    toolkit: &'a Toolkit,
    policy: AttemptPolicy,
    ctx: &'a RunContext,
}

impl Pipeline<'_> {
    /// Runs the work of `stage` and reports how it went.
    async fn execute(&self, stage: &Stage) -> Transition {
        match stage {
            Stage::Probing { candidate } => {
                let _busy = self.ctx.gauge().enter();
                let cand = &self.candidates[*candidate];
                tokio::select! {
                    biased;
                    _ = self.ctx.cancelled() => Transition::Cancelled,
                    res = self.toolkit.prober.probe(cand, self.policy.target_width) => match res {
                        Ok(report) => Transition::ProbePassed(report),
                        Err(e) => Transition::Failed(e),
                    },
                }
            }
            Stage::Downloading { probe, .. } => {
                if self.ctx.is_cancelled() {
                    return Transition::Cancelled;
                }
                let _busy = self.ctx.gauge().enter();
                let req = DownloadRequest {
                    episode: self.number,
                    stream_url: probe.stream_url.clone(),
                    output_path: self.output_path.to_path_buf(),
                };
                let res = self.toolkit.downloader.download(&req, self.ctx.token()).await;
                match res {
                    Ok(path) if !self.ctx.is_cancelled() => Transition::DownloadPassed(path),
                    Ok(path) => {
                        remove_output(&path).await;
                        Transition::Cancelled
                    }
                    Err(HarvestError::GlobalCancellation) => {
                        remove_output(self.output_path).await;
                        Transition::Cancelled
                    }
                    Err(e) => {
                        remove_output(self.output_path).await;
                        Transition::Failed(e)
                    }
                }
            }
            Stage::Verifying { output, .. } => {
                let t = tokio::select! {
                    biased;
                    _ = self.ctx.cancelled() => Transition::Cancelled,
                    res = self.toolkit.verifier.verify(output, self.policy.target_width) => match res {
                        Ok(resolution) => Transition::VerifyPassed(resolution),
                        Err(e) => Transition::Failed(e),
                    },
                };
                if !matches!(t, Transition::VerifyPassed(_)) {
                    remove_output(output).await;
                }
                t
            }
            // Pending; terminal stages are never executed.
            _ => Transition::Start,
        }
    }

    async fn announce(&self, stage: &Stage, cursor: &CandidateCursor) {
        let Some(idx) = stage.candidate() else {
            return;
        };
        let candidate = self.candidates[idx].label.clone();
        let kind = match stage {
            Stage::Probing { .. } => EventKind::Probing {
                candidate,
                attempt: cursor.attempted(),
            },
            Stage::Downloading { .. } => EventKind::Downloading { candidate },
            Stage::Verifying { .. } => EventKind::Verifying { candidate },
            _ => return,
        };
        self.ctx.emit(self.number, kind).await;
    }
}

/// Drives one episode from `Pending` to a terminal stage.
///
/// Never fails: every way the pipeline can end is captured in the returned
/// report. An output file is left on disk only when the episode is verified.
pub async fn run_episode(
    episode: Episode,
    out_dir: PathBuf,
    toolkit: Arc<Toolkit>,
    policy: AttemptPolicy,
    ctx: RunContext,
) -> EpisodeReport {
    let number = episode.number;
    let output_path = episode.output_path(&out_dir);
    let candidates = rank(episode.candidates.clone()).unwrap_or_default();
    let pipeline = Pipeline {
        number,
        candidates: &candidates,
        output_path: &output_path,
        toolkit: &toolkit,
        policy,
        ctx: &ctx,
    };

    let mut cursor = CandidateCursor::new(candidates.len(), policy.max_candidate_attempts);
    let mut attempts: Vec<CandidateAttempt> = Vec::new();
    let mut stage = Stage::Pending;
    let mut transition = if ctx.is_cancelled() {
        Transition::Cancelled
    } else {
        Transition::Start
    };

    ctx.emit(number, EventKind::Started).await;
    tracing::debug!(episode = number, candidates = candidates.len(), "episode started");

    loop {
        if let Some(idx) = stage.candidate() {
            if let Some(attempt) = attempts.last_mut() {
                attempt.record(&stage, &transition);
            }
            if let Transition::Failed(error) = &transition {
                tracing::info!(
                    episode = number,
                    candidate = %candidates[idx].label,
                    tag = candidates[idx].tag.as_str(),
                    stage = stage.name(),
                    error = %error,
                    "candidate failed"
                );
                let kind = EventKind::CandidateFailed {
                    candidate: candidates[idx].label.clone(),
                    error: error.clone(),
                };
                ctx.emit(number, kind).await;
            }
        }

        stage = stage.advance(transition, &mut cursor);
        if let Stage::Probing { candidate } = &stage {
            attempts.push(CandidateAttempt::new(&candidates[*candidate]));
        }
        pipeline.announce(&stage, &cursor).await;

        if stage.is_terminal() {
            break;
        }
        transition = pipeline.execute(&stage).await;
    }

    let outcome = match stage {
        Stage::Done {
            candidate,
            output,
            resolution,
        } => EpisodeOutcome::Verified {
            output,
            resolution,
            source: candidates[candidate].label.clone(),
        },
        Stage::Exhausted { reason } => EpisodeOutcome::Failed(reason),
        _ => EpisodeOutcome::Interrupted,
    };

    for attempt in &attempts {
        tracing::debug!(
            episode = number,
            candidate = %attempt.label,
            tag = attempt.tag.as_str(),
            verification = attempt.verification.as_str(),
            stage = attempt.stage_reached,
            "attempt trail"
        );
    }
    match &outcome {
        EpisodeOutcome::Verified {
            resolution, source, ..
        } => tracing::info!(episode = number, %resolution, source = %source, "episode verified"),
        EpisodeOutcome::Failed(reason) => {
            tracing::warn!(episode = number, reason = %reason, attempts = attempts.len(), "episode failed")
        }
        EpisodeOutcome::Interrupted => tracing::info!(episode = number, "episode interrupted"),
    }
    ctx.emit(
        number,
        EventKind::Finished {
            status: outcome.status(),
        },
    )
    .await;

    EpisodeReport::new(&episode, outcome, attempts)
}
