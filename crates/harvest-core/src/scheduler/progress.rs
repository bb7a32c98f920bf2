//! Stage events published while episodes run (CLI-friendly).

use crate::episode::EpisodeStatus;
use crate::error::HarvestError;

/// One stage change of one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeEvent {
    pub episode: u32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Started,
    /// `attempt` is 1-based across the episode's candidates.
    Probing { candidate: String, attempt: usize },
    Downloading { candidate: String },
    Verifying { candidate: String },
    CandidateFailed { candidate: String, error: HarvestError },
    Finished { status: EpisodeStatus },
}

impl EpisodeEvent {
    /// Single-line description for terminal output.
    pub fn describe(&self) -> String {
        let ep = format!("EP{:02}", self.episode);
        match &self.kind {
            EventKind::Started => format!("{} started", ep),
            EventKind::Probing { candidate, attempt } => {
                format!("{} probing [{}] (attempt {})", ep, candidate, attempt)
            }
            EventKind::Downloading { candidate } => format!("{} downloading [{}]", ep, candidate),
            EventKind::Verifying { candidate } => format!("{} verifying [{}]", ep, candidate),
            EventKind::CandidateFailed { candidate, error } => {
                format!("{} [{}] failed: {}", ep, candidate, error)
            }
            EventKind::Finished { status } => format!("{} {}", ep, status.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lines() {
        let ev = EpisodeEvent {
            episode: 7,
            kind: EventKind::Probing {
                candidate: "海外推薦".into(),
                attempt: 2,
            },
        };
        assert_eq!(ev.describe(), "EP07 probing [海外推薦] (attempt 2)");

        let ev = EpisodeEvent {
            episode: 12,
            kind: EventKind::Finished {
                status: EpisodeStatus::Verified,
            },
        };
        assert_eq!(ev.describe(), "EP12 verified");
    }
}
