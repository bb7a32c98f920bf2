//! Source candidates and their fixed priority ranking.
//!
//! Source buttons on listing pages carry labels such as "海外推薦FLV" or
//! "推薦". The label decides the priority tag; candidates are tried in tag
//! order, ties kept in discovery order.

use crate::error::HarvestError;

/// Priority tag derived from a source label. Variant order is the ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityTag {
    OverseasRecommended,
    Overseas,
    Recommended,
    Other,
}

impl PriorityTag {
    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTag::OverseasRecommended => "overseas-recommended",
            PriorityTag::Overseas => "overseas",
            PriorityTag::Recommended => "recommended",
            PriorityTag::Other => "other",
        }
    }

    /// Classifies a source button label.
    pub fn classify(label: &str) -> Self {
        let lower = label.to_lowercase();
        let overseas = label.contains("海外") || lower.contains("overseas");
        let recommended = label.contains("推薦")
            || label.contains("推荐")
            || lower.contains("recommended");
        match (overseas, recommended) {
            (true, true) => PriorityTag::OverseasRecommended,
            (true, false) => PriorityTag::Overseas,
            (false, true) => PriorityTag::Recommended,
            (false, false) => PriorityTag::Other,
        }
    }
}

/// How far a candidate got through verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verification {
    #[default]
    Unverified,
    FastPassed,
    FastFailed,
    FinalPassed,
    FinalFailed,
}

impl Verification {
    pub fn as_str(self) -> &'static str {
        match self {
            Verification::Unverified => "unverified",
            Verification::FastPassed => "fast-passed",
            Verification::FastFailed => "fast-failed",
            Verification::FinalPassed => "final-passed",
            Verification::FinalFailed => "final-failed",
        }
    }
}

/// One stream URL offered for an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCandidate {
    /// Text of the source button the URL was captured from.
    pub label: String,
    pub url: String,
    pub tag: PriorityTag,
    /// Position in discovery order; breaks ties between equal tags.
    pub discovery_index: usize,
}

impl SourceCandidate {
    pub fn new(label: impl Into<String>, url: impl Into<String>, discovery_index: usize) -> Self {
        let label = label.into();
        Self {
            tag: PriorityTag::classify(&label),
            label,
            url: url.into(),
            discovery_index,
        }
    }
}

/// Orders candidates by priority tag, keeping discovery order within a tag.
///
/// Returns `NoSourcesFound` for an empty list.
pub fn rank(mut candidates: Vec<SourceCandidate>) -> Result<Vec<SourceCandidate>, HarvestError> {
    if candidates.is_empty() {
        return Err(HarvestError::NoSourcesFound);
    }
    candidates.sort_by_key(|c| (c.tag, c.discovery_index));
    Ok(candidates)
}

/// Flattens (label, captured URLs) pairs into candidates.
///
/// URLs captured later for the same source are tried first, so each source's
/// URL list is reversed before discovery indices are assigned. Duplicate URLs
/// (same stream offered by two buttons) are kept once, at their first position.
pub fn candidates_from_sources<'a, I>(sources: I) -> Vec<SourceCandidate>
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut out: Vec<SourceCandidate> = Vec::new();
    for (label, urls) in sources {
        for url in urls.iter().rev() {
            let url = url.trim();
            if url.is_empty() || out.iter().any(|c| c.url == url) {
                continue;
            }
            let idx = out.len();
            out.push(SourceCandidate::new(label, url, idx));
        }
    }
    out
}

/// Keeps sources whose label contains `preferred` (case-insensitive).
/// If nothing matches, or no preference is given, all labels are kept.
pub fn filter_preferred<'a>(labels: &[&'a str], preferred: Option<&str>) -> Vec<&'a str> {
    let Some(pref) = preferred.map(str::trim).filter(|p| !p.is_empty()) else {
        return labels.to_vec();
    };
    let pref = pref.to_lowercase();
    let matched: Vec<&str> = labels
        .iter()
        .copied()
        .filter(|l| l.to_lowercase().contains(&pref))
        .collect();
    if matched.is_empty() {
        labels.to_vec()
    } else {
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_labels() {
        assert_eq!(PriorityTag::classify("海外推薦FLV"), PriorityTag::OverseasRecommended);
        assert_eq!(PriorityTag::classify("海外FLV"), PriorityTag::Overseas);
        assert_eq!(PriorityTag::classify("推薦FLV"), PriorityTag::Recommended);
        assert_eq!(PriorityTag::classify("推荐"), PriorityTag::Recommended);
        assert_eq!(PriorityTag::classify("FLV"), PriorityTag::Other);
        assert_eq!(
            PriorityTag::classify("Overseas Recommended"),
            PriorityTag::OverseasRecommended
        );
    }

    #[test]
    fn tag_order_is_ranking_order() {
        assert!(PriorityTag::OverseasRecommended < PriorityTag::Overseas);
        assert!(PriorityTag::Overseas < PriorityTag::Recommended);
        assert!(PriorityTag::Recommended < PriorityTag::Other);
    }

    #[test]
    fn rank_empty_is_no_sources() {
        assert_eq!(rank(Vec::new()), Err(HarvestError::NoSourcesFound));
    }

    #[test]
    fn rank_sorts_by_tag_and_keeps_discovery_order() {
        let cands = vec![
            SourceCandidate::new("FLV", "https://a/other1.m3u8", 0),
            SourceCandidate::new("推薦", "https://a/rec1.m3u8", 1),
            SourceCandidate::new("海外推薦", "https://a/or.m3u8", 2),
            SourceCandidate::new("FLV2", "https://a/other2.m3u8", 3),
            SourceCandidate::new("推薦2", "https://a/rec2.m3u8", 4),
            SourceCandidate::new("海外", "https://a/o.m3u8", 5),
        ];
        let ranked = rank(cands).unwrap();
        let urls: Vec<&str> = ranked.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a/or.m3u8",
                "https://a/o.m3u8",
                "https://a/rec1.m3u8",
                "https://a/rec2.m3u8",
                "https://a/other1.m3u8",
                "https://a/other2.m3u8",
            ]
        );
    }

    #[test]
    fn sources_flatten_last_captured_first() {
        let a = vec!["u1".to_string(), "u2".to_string()];
        let b = vec!["u3".to_string(), "u2".to_string()];
        let cands = candidates_from_sources([("海外", a.as_slice()), ("推薦", b.as_slice())]);
        let got: Vec<(&str, usize)> = cands
            .iter()
            .map(|c| (c.url.as_str(), c.discovery_index))
            .collect();
        assert_eq!(got, vec![("u2", 0), ("u1", 1), ("u3", 2)]);
        assert_eq!(cands[2].tag, PriorityTag::Recommended);
    }

    #[test]
    fn preferred_filter_falls_back_to_all() {
        let labels = ["海外推薦FLV", "推薦", "flv備用"];
        assert_eq!(
            filter_preferred(&labels, Some("FLV")),
            vec!["海外推薦FLV", "flv備用"]
        );
        assert_eq!(filter_preferred(&labels, Some("MP4")), labels.to_vec());
        assert_eq!(filter_preferred(&labels, None), labels.to_vec());
        assert_eq!(filter_preferred(&labels, Some("  ")), labels.to_vec());
    }
}
