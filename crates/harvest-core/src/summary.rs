//! End-of-run summary and the process exit status derived from it.

use std::fmt::Write as _;

use crate::episode::EpisodeStatus;
use crate::orchestrator::EpisodeReport;

/// How the run ended, from the operator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Every episode verified.
    Success,
    /// At least one episode failed.
    Partial,
    /// The stop signal fired.
    Cancelled,
}

impl RunExit {
    pub fn code(self) -> i32 {
        match self {
            RunExit::Success => 0,
            RunExit::Partial => 2,
            RunExit::Cancelled => 130,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Sorted by episode number.
    pub reports: Vec<EpisodeReport>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new(mut reports: Vec<EpisodeReport>, cancelled: bool) -> Self {
        reports.sort_by_key(|r| r.number);
        Self { reports, cancelled }
    }

    fn count(&self, status: EpisodeStatus) -> usize {
        self.reports.iter().filter(|r| r.status() == status).count()
    }

    pub fn verified_count(&self) -> usize {
        self.count(EpisodeStatus::Verified)
    }

    pub fn failed_count(&self) -> usize {
        self.count(EpisodeStatus::Failed)
    }

    pub fn interrupted_count(&self) -> usize {
        self.count(EpisodeStatus::Interrupted)
    }

    pub fn exit_status(&self) -> RunExit {
        if self.cancelled || self.interrupted_count() > 0 {
            RunExit::Cancelled
        } else if self.failed_count() > 0 {
            RunExit::Partial
        } else {
            RunExit::Success
        }
    }

    /// Table of every episode with its outcome and reason, plus a totals line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.reports.is_empty() {
            out.push_str("No episodes found.\n");
            return out;
        }
        let _ = writeln!(out, "{:<5} {:<12} {:<9} {:<28} {}", "EP", "STATUS", "ATTEMPTS", "FILE", "DETAIL");
        for r in &self.reports {
            let _ = writeln!(
                out,
                "{:<5} {:<12} {:<9} {:<28} {}",
                r.number,
                r.status().as_str(),
                r.attempts.len(),
                r.file_name,
                r.reason()
            );
        }
        let _ = writeln!(
            out,
            "{} verified, {} failed, {} interrupted",
            self.verified_count(),
            self.failed_count(),
            self.interrupted_count()
        );
        out
    }
}
