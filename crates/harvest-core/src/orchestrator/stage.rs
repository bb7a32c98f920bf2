//! Per-episode stage machine. Pure: no I/O, driven by `Transition`s.

use std::path::PathBuf;

use crate::error::HarvestError;
use crate::media::Resolution;
use crate::probe::ProbeReport;

/// Hands out candidate indices in ranked order, at most once each.
#[derive(Debug, Clone)]
pub struct CandidateCursor {
    total: usize,
    next: usize,
    budget: Option<usize>,
}

impl CandidateCursor {
    /// `budget` caps how many candidates may be attempted; values below 1 count as 1.
    pub fn new(total: usize, budget: Option<usize>) -> Self {
        Self {
            total,
            next: 0,
            budget: budget.map(|b| b.max(1)),
        }
    }

    /// Candidates handed out so far.
    pub fn attempted(&self) -> usize {
        self.next
    }

    /// Next candidate index, or the reason the episode is exhausted.
    pub fn next_candidate(&mut self) -> Result<usize, HarvestError> {
        if self.total == 0 {
            return Err(HarvestError::NoSourcesFound);
        }
        if self.next >= self.total {
            return Err(HarvestError::AllCandidatesExhausted {
                attempted: self.next,
            });
        }
        if let Some(budget) = self.budget {
            if self.next >= budget {
                return Err(HarvestError::BudgetExhausted {
                    budget,
                    remaining: self.total - self.next,
                });
            }
        }
        let idx = self.next;
        self.next += 1;
        Ok(idx)
    }
}

/// Where one episode's pipeline stands. Candidate fields are indices into the ranked list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Probing {
        candidate: usize,
    },
    Downloading {
        candidate: usize,
        probe: ProbeReport,
    },
    Verifying {
        candidate: usize,
        output: PathBuf,
    },
    Done {
        candidate: usize,
        output: PathBuf,
        resolution: Resolution,
    },
    Exhausted {
        reason: HarvestError,
    },
    Interrupted,
}

/// Outcome of executing the current stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Start,
    ProbePassed(ProbeReport),
    DownloadPassed(PathBuf),
    VerifyPassed(Resolution),
    Failed(HarvestError),
    Cancelled,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::Done { .. } | Stage::Exhausted { .. } | Stage::Interrupted
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Probing { .. } => "probing",
            Stage::Downloading { .. } => "downloading",
            Stage::Verifying { .. } => "verifying",
            Stage::Done { .. } => "done",
            Stage::Exhausted { .. } => "exhausted",
            Stage::Interrupted => "interrupted",
        }
    }

    /// Candidate the stage is working on, if any.
    pub fn candidate(&self) -> Option<usize> {
        match self {
            Stage::Probing { candidate }
            | Stage::Downloading { candidate, .. }
            | Stage::Verifying { candidate, .. }
            | Stage::Done { candidate, .. } => Some(*candidate),
            _ => None,
        }
    }

    /// Applies `t`. Terminal stages never change. A candidate-scoped failure
    /// moves to the next candidate; any other failure ends the episode with
    /// that error as the reason. A stop signal ends in `Interrupted`.
    pub fn advance(self, t: Transition, cursor: &mut CandidateCursor) -> Stage {
        if self.is_terminal() {
            return self;
        }
        match (self, t) {
            (_, Transition::Cancelled) | (_, Transition::Failed(HarvestError::GlobalCancellation)) => {
                Stage::Interrupted
            }
            (Stage::Pending, Transition::Start) => next_probe(cursor),
            (Stage::Probing { candidate }, Transition::ProbePassed(probe)) => {
                Stage::Downloading { candidate, probe }
            }
            (Stage::Downloading { candidate, .. }, Transition::DownloadPassed(output)) => {
                Stage::Verifying { candidate, output }
            }
            (Stage::Verifying { candidate, output }, Transition::VerifyPassed(resolution)) => {
                Stage::Done {
                    candidate,
                    output,
                    resolution,
                }
            }
            (
                Stage::Probing { .. } | Stage::Downloading { .. } | Stage::Verifying { .. },
                Transition::Failed(e),
            ) => {
                if e.is_candidate_failure() {
                    next_probe(cursor)
                } else {
                    Stage::Exhausted { reason: e }
                }
            }
            (stage, t) => {
                tracing::warn!(stage = stage.name(), transition = ?t, "ignored out-of-order transition");
                stage
            }
        }
    }
}

fn next_probe(cursor: &mut CandidateCursor) -> Stage {
    match cursor.next_candidate() {
        Ok(candidate) => Stage::Probing { candidate },
        Err(reason) => Stage::Exhausted { reason },
    }
}
