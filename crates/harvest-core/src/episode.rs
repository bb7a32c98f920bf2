//! Episode model and deterministic output naming.

use std::path::{Path, PathBuf};

use crate::source::SourceCandidate;

/// Show name used when the listing title yields nothing usable.
const DEFAULT_SHOW_NAME: &str = "Unknown";

/// Output container extension for merged files.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// One episode found on a listing page.
///
/// `candidates` is fixed at discovery time; the orchestrator ranks a copy.
#[derive(Debug, Clone)]
pub struct Episode {
    /// 1-based episode number.
    pub number: u32,
    /// Label shown on the episode button (e.g. "第01集").
    pub label: String,
    pub candidates: Vec<SourceCandidate>,
    /// Output file name inside the output directory.
    pub file_name: String,
}

impl Episode {
    pub fn output_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(&self.file_name)
    }
}

/// Final state of an episode once it leaves active work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeStatus {
    Verified,
    Failed,
    Interrupted,
}

impl EpisodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EpisodeStatus::Verified => "verified",
            EpisodeStatus::Failed => "failed",
            EpisodeStatus::Interrupted => "interrupted",
        }
    }
}

/// Sanitizes a show name for use in a file name.
///
/// - Replaces `\ / : * ? " < > |`, NUL and control characters with `_`
/// - Trims surrounding whitespace, dots and underscores
/// - Limits length to 200 bytes so the full `.SxxxEyyy.mp4` name stays under NAME_MAX
pub fn sanitize_show_name(name: &str) -> String {
    const MAX_LEN: usize = 200;

    let replaced: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.' || c == '_');

    if trimmed.len() > MAX_LEN {
        let mut take = MAX_LEN;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derives the show name from a page title like `"Show Name - Site"`.
pub fn show_name_from_title(title: &str) -> String {
    let head = title.split(" - ").next().unwrap_or("").trim();
    let name = sanitize_show_name(head);
    if name.is_empty() {
        DEFAULT_SHOW_NAME.to_string()
    } else {
        name
    }
}

/// Output file name for an episode: `<Show>.S001.E007.mp4`.
pub fn episode_file_name(show: &str, season: u32, number: u32) -> String {
    let show = sanitize_show_name(show);
    let show = if show.is_empty() {
        DEFAULT_SHOW_NAME
    } else {
        show.as_str()
    };
    format!("{show}.S{season:03}.E{number:03}.{OUTPUT_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_zero_padded() {
        assert_eq!(episode_file_name("Show", 1, 7), "Show.S001.E007.mp4");
        assert_eq!(episode_file_name("Show", 2, 123), "Show.S002.E123.mp4");
    }

    #[test]
    fn sanitize_replaces_reserved_chars() {
        assert_eq!(sanitize_show_name("A/B:C*D?"), "A_B_C_D");
        assert_eq!(sanitize_show_name("  ..名稱<1>  "), "名稱_1");
        assert_eq!(sanitize_show_name("tab\there"), "tab_here");
    }

    #[test]
    fn show_name_from_page_title() {
        assert_eq!(show_name_from_title("劇名 - 某站線上看"), "劇名");
        assert_eq!(show_name_from_title("Just Title"), "Just Title");
        assert_eq!(show_name_from_title(""), "Unknown");
        assert_eq!(show_name_from_title(" - Site"), "Unknown");
    }

    #[test]
    fn empty_show_falls_back_in_file_name() {
        assert_eq!(episode_file_name("///", 1, 1), "Unknown.S001.E001.mp4");
    }

    #[test]
    fn output_path_joins_dir() {
        let ep = Episode {
            number: 3,
            label: "第03集".into(),
            candidates: Vec::new(),
            file_name: "Show.S001.E003.mp4".into(),
        };
        assert_eq!(
            ep.output_path(Path::new("/out")),
            PathBuf::from("/out/Show.S001.E003.mp4")
        );
    }
}
