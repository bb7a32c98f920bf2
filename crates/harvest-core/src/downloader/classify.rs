//! Classify a finished downloader run from its exit status and output.

use crate::process::ToolOutput;

/// Output lines kept in a failure diagnostic.
const DIAGNOSTIC_LINES: usize = 6;

/// Substrings that mean a run failed even when the tool exited 0.
/// Matched case-sensitively so ordinary words like "error" in URLs are ignored.
const ERROR_MARKERS: &[&str] = &["ERROR", "Error:", "FAILED", "Failed to"];

/// Lowercase substrings that mean a run failed.
const ERROR_MARKERS_LOWER: &[&str] = &[
    "segment count mismatch",
    "segments mismatch",
    "download failed",
    "no segments",
];

/// Lowercase substrings that mean the tool did not accept its arguments.
const REJECTED_ARGS_MARKERS: &[&str] = &[
    "unrecognized",
    "unknown option",
    "unknown argument",
    "invalid option",
    "required argument",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    /// The flag set was refused; another flag set may work.
    RejectedArguments,
    Failed(String),
}

/// Decides the outcome of one downloader invocation.
pub fn classify_run(out: &ToolOutput) -> Verdict {
    let text = out.combined();
    let lower = text.to_lowercase();

    if !out.success() {
        if REJECTED_ARGS_MARKERS.iter().any(|m| lower.contains(m)) {
            return Verdict::RejectedArguments;
        }
        let code = out
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Verdict::Failed(with_tail(&format!("exit {}", code), out));
    }

    if let Some(marker) = find_marker(&text, &lower) {
        return Verdict::Failed(with_tail(&format!("exit 0 with `{}` in output", marker), out));
    }
    Verdict::Success
}

fn find_marker(text: &str, lower: &str) -> Option<&'static str> {
    ERROR_MARKERS
        .iter()
        .find(|m| text.contains(*m))
        .or_else(|| ERROR_MARKERS_LOWER.iter().find(|m| lower.contains(*m)))
        .copied()
}

fn with_tail(head: &str, out: &ToolOutput) -> String {
    let tail = out.tail(DIAGNOSTIC_LINES);
    if tail.is_empty() {
        head.to_string()
    } else {
        format!("{}: {}", head, tail)
    }
}
