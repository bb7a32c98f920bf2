//! Failure taxonomy for episode pipelines.
//!
//! Per-candidate failures (probe, download, final verification) are recovered
//! by the orchestrator through fallback to the next candidate. Only
//! `NoSourcesFound`, the exhaustion variants, and `GlobalCancellation` end an
//! episode.

use std::time::Duration;

use crate::media::Resolution;

fn describe_actual(actual: &Option<Resolution>) -> String {
    match actual {
        Some(r) => r.to_string(),
        None => "unknown".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarvestError {
    /// Discovery produced no candidate streams for the episode.
    #[error("no sources found")]
    NoSourcesFound,

    /// The fast probe did not finish within its time limit.
    #[error("probe timed out after {}s", .0.as_secs())]
    ProbeTimeout(Duration),

    /// Connection error, HTTP error, or a playlist whose resolution could not be read.
    #[error("probe failed: {0}")]
    ProbeUnavailable(String),

    /// Stream reachable but narrower than the target.
    #[error("probe resolution {actual} below target width {target_width}")]
    ProbeResolutionMismatch {
        actual: Resolution,
        target_width: u32,
    },

    /// External downloader or merge tool failed (nonzero exit, error output, no segments).
    #[error("download failed: {0}")]
    DownloadToolFailure(String),

    /// Merged output is narrower than the target, or its resolution could not be read.
    #[error("final resolution {} below target width {target_width}", describe_actual(.actual))]
    FinalResolutionMismatch {
        actual: Option<Resolution>,
        target_width: u32,
    },

    /// Every ranked candidate was tried and none produced a verified file.
    #[error("all {attempted} candidate(s) exhausted")]
    AllCandidatesExhausted { attempted: usize },

    /// The per-episode attempt budget ran out before a candidate succeeded.
    #[error("attempt budget of {budget} exhausted ({remaining} candidate(s) untried)")]
    BudgetExhausted { budget: usize, remaining: usize },

    /// Run-wide stop signal.
    #[error("interrupted by cancellation")]
    GlobalCancellation,

    /// The episode's worker task died without producing a report.
    #[error("pipeline task failed: {0}")]
    Internal(String),
}

impl HarvestError {
    /// True for failures scoped to one candidate; the orchestrator falls back on these.
    pub fn is_candidate_failure(&self) -> bool {
        matches!(
            self,
            HarvestError::ProbeTimeout(_)
                | HarvestError::ProbeUnavailable(_)
                | HarvestError::ProbeResolutionMismatch { .. }
                | HarvestError::DownloadToolFailure(_)
                | HarvestError::FinalResolutionMismatch { .. }
        )
    }

    /// Short machine-friendly name used in the summary and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::NoSourcesFound => "no_sources_found",
            HarvestError::ProbeTimeout(_) => "probe_timeout",
            HarvestError::ProbeUnavailable(_) => "probe_unavailable",
            HarvestError::ProbeResolutionMismatch { .. } => "probe_resolution_mismatch",
            HarvestError::DownloadToolFailure(_) => "download_tool_failure",
            HarvestError::FinalResolutionMismatch { .. } => "final_resolution_mismatch",
            HarvestError::AllCandidatesExhausted { .. } => "all_candidates_exhausted",
            HarvestError::BudgetExhausted { .. } => "budget_exhausted",
            HarvestError::GlobalCancellation => "global_cancellation",
            HarvestError::Internal(_) => "internal",
        }
    }
}
