//! What an episode pipeline leaves behind for the run summary.

use std::path::PathBuf;

use crate::episode::{Episode, EpisodeStatus};
use crate::error::HarvestError;
use crate::media::Resolution;
use crate::source::{PriorityTag, SourceCandidate, Verification};

use super::stage::{Stage, Transition};

/// One candidate tried for an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAttempt {
    pub label: String,
    pub url: String,
    pub tag: PriorityTag,
    pub verification: Verification,
    /// Last stage this candidate entered.
    pub stage_reached: &'static str,
    pub failure: Option<HarvestError>,
}

impl CandidateAttempt {
    pub fn new(candidate: &SourceCandidate) -> Self {
        Self {
            label: candidate.label.clone(),
            url: candidate.url.clone(),
            tag: candidate.tag,
            verification: Verification::Unverified,
            stage_reached: "probing",
            failure: None,
        }
    }

    /// Folds the result of executing `stage` into this attempt.
    pub fn record(&mut self, stage: &Stage, t: &Transition) {
        self.stage_reached = stage.name();
        match (stage, t) {
            (Stage::Probing { .. }, Transition::ProbePassed(_)) => {
                self.verification = Verification::FastPassed;
            }
            (Stage::Probing { .. }, Transition::Failed(e)) => {
                self.verification = Verification::FastFailed;
                self.failure = Some(e.clone());
            }
            (Stage::Verifying { .. }, Transition::VerifyPassed(_)) => {
                self.verification = Verification::FinalPassed;
            }
            (Stage::Verifying { .. }, Transition::Failed(e)) => {
                self.verification = Verification::FinalFailed;
                self.failure = Some(e.clone());
            }
            (_, Transition::Failed(e)) => self.failure = Some(e.clone()),
            (_, Transition::Cancelled) => self.failure = Some(HarvestError::GlobalCancellation),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeOutcome {
    Verified {
        output: PathBuf,
        resolution: Resolution,
        /// Label of the source that produced the file.
        source: String,
    },
    Failed(HarvestError),
    Interrupted,
}

impl EpisodeOutcome {
    pub fn status(&self) -> EpisodeStatus {
        match self {
            EpisodeOutcome::Verified { .. } => EpisodeStatus::Verified,
            EpisodeOutcome::Failed(_) => EpisodeStatus::Failed,
            EpisodeOutcome::Interrupted => EpisodeStatus::Interrupted,
        }
    }
}

/// Terminal record of one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeReport {
    pub number: u32,
    pub label: String,
    pub file_name: String,
    pub outcome: EpisodeOutcome,
    pub attempts: Vec<CandidateAttempt>,
}

impl EpisodeReport {
    pub fn new(episode: &Episode, outcome: EpisodeOutcome, attempts: Vec<CandidateAttempt>) -> Self {
        Self {
            number: episode.number,
            label: episode.label.clone(),
            file_name: episode.file_name.clone(),
            outcome,
            attempts,
        }
    }

    /// Report for an episode that never got a worker before the stop signal.
    pub fn interrupted(episode: &Episode) -> Self {
        Self::new(episode, EpisodeOutcome::Interrupted, Vec::new())
    }

    pub fn status(&self) -> EpisodeStatus {
        self.outcome.status()
    }

    /// Human-readable reason for the outcome.
    pub fn reason(&self) -> String {
        match &self.outcome {
            EpisodeOutcome::Verified {
                resolution, source, ..
            } => format!("{} via {}", resolution, source),
            EpisodeOutcome::Failed(e) => e.to_string(),
            EpisodeOutcome::Interrupted => HarvestError::GlobalCancellation.to_string(),
        }
    }
}
