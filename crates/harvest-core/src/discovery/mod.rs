//! Episode discovery: where episodes and their candidate stream URLs come from.
//!
//! Browser automation, site scrapers and saved manifests all sit behind
//! `EpisodeDiscovery`; the pipeline only ever sees `Episode`s with their
//! candidate lists fixed.

mod manifest;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::episode::{episode_file_name, Episode};
use crate::source::{candidates_from_sources, filter_preferred};

pub use manifest::ManifestDiscovery;

/// Browser behaviour requested by the operator. Backends without a browser ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserOptions {
    /// Block images, fonts and media while sniffing.
    pub fast: bool,
    pub headless: bool,
    pub minimize: bool,
    pub show_ui: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            fast: true,
            headless: false,
            minimize: true,
            show_ui: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    /// Listing page; None lets the backend use its own.
    pub page_url: Option<String>,
    /// CSS selector(s) for episode buttons.
    pub episode_selector: String,
    /// Preferred source button text.
    pub source_text: Option<String>,
    /// Wait after each click for stream requests.
    pub click_wait: Duration,
    pub browser: BrowserOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEpisode {
    /// 1-based position on the listing.
    pub number: u32,
    pub label: String,
}

/// What a listing page offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub show_name: String,
    pub season: u32,
    pub episodes: Vec<DiscoveredEpisode>,
}

/// Stream URLs captured after clicking one source button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSource {
    pub label: String,
    /// In capture order.
    pub urls: Vec<String>,
}

#[async_trait]
pub trait EpisodeDiscovery: Send + Sync {
    async fn discover_episodes(&self, request: &DiscoveryRequest) -> Result<Listing>;

    async fn discover_candidate_sources(
        &self,
        request: &DiscoveryRequest,
        episode: &DiscoveredEpisode,
    ) -> Result<Vec<DiscoveredSource>>;
}

/// Discovers the listing and turns it into episodes with candidate lists.
///
/// Episodes numbered below `start_episode` are skipped. A source lookup that
/// fails leaves that episode with no candidates (it will end as no sources
/// found) instead of aborting the run. A listing that repeats an episode
/// number is rejected, since both entries would write the same output file.
pub async fn build_episodes(
    discovery: &dyn EpisodeDiscovery,
    request: &DiscoveryRequest,
    start_episode: u32,
) -> Result<Vec<Episode>> {
    let listing = discovery.discover_episodes(request).await?;
    tracing::info!(
        show = %listing.show_name,
        season = listing.season,
        episodes = listing.episodes.len(),
        "listing discovered"
    );

    let mut seen = HashSet::new();
    for found in &listing.episodes {
        if !seen.insert(found.number) {
            anyhow::bail!(
                "listing has more than one episode numbered {} ({})",
                found.number,
                found.label
            );
        }
    }

    let mut episodes = Vec::new();
    for found in &listing.episodes {
        if found.number < start_episode {
            tracing::debug!(episode = found.number, start_episode, "skipped before start episode");
            continue;
        }

        let sources = match discovery.discover_candidate_sources(request, found).await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!(episode = found.number, error = %e, "source discovery failed");
                Vec::new()
            }
        };
        let labels: Vec<&str> = sources.iter().map(|s| s.label.as_str()).collect();
        let keep = filter_preferred(&labels, request.source_text.as_deref());
        let candidates = candidates_from_sources(
            sources
                .iter()
                .filter(|s| keep.contains(&s.label.as_str()))
                .map(|s| (s.label.as_str(), s.urls.as_slice())),
        );
        tracing::debug!(episode = found.number, candidates = candidates.len(), "candidates collected");

        episodes.push(Episode {
            number: found.number,
            label: found.label.clone(),
            candidates,
            file_name: episode_file_name(&listing.show_name, listing.season, found.number),
        });
    }
    Ok(episodes)
}
