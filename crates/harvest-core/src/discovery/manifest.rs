//! Discovery from a JSON listing manifest written by an external scraper.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::episode::show_name_from_title;

use super::{
    DiscoveredEpisode, DiscoveredSource, DiscoveryRequest, EpisodeDiscovery, Listing,
};

fn default_season() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    #[serde(default)]
    page_url: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default = "default_season")]
    season: u32,
    #[serde(default)]
    episodes: Vec<ManifestEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestEpisode {
    /// Defaults to the 1-based position in `episodes`.
    #[serde(default)]
    number: Option<u32>,
    #[serde(default)]
    label: String,
    #[serde(default)]
    sources: Vec<ManifestSource>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestSource {
    label: String,
    #[serde(default)]
    urls: Vec<String>,
}

/// `EpisodeDiscovery` over a saved listing manifest.
#[derive(Debug, Clone)]
pub struct ManifestDiscovery {
    manifest: Manifest,
}

fn same_page(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}

impl ManifestDiscovery {
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json).context("parse listing manifest")?;
        Ok(Self { manifest })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest: {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("manifest: {}", path.display()))
    }

    fn number_of(index: usize, ep: &ManifestEpisode) -> u32 {
        ep.number
            .unwrap_or_else(|| u32::try_from(index + 1).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl EpisodeDiscovery for ManifestDiscovery {
    async fn discover_episodes(&self, request: &DiscoveryRequest) -> Result<Listing> {
        if let (Some(wanted), Some(have)) = (&request.page_url, &self.manifest.page_url) {
            if !same_page(wanted, have) {
                anyhow::bail!(
                    "manifest is for {} but {} was requested",
                    have.trim(),
                    wanted.trim()
                );
            }
        }

        let mut positions: HashMap<u32, usize> = HashMap::new();
        let mut episodes = Vec::with_capacity(self.manifest.episodes.len());
        for (i, ep) in self.manifest.episodes.iter().enumerate() {
            let number = Self::number_of(i, ep);
            if let Some(first) = positions.insert(number, i) {
                anyhow::bail!(
                    "manifest entries {} and {} are both episode {}",
                    first + 1,
                    i + 1,
                    number
                );
            }
            let label = if ep.label.trim().is_empty() {
                format!("EP{:02}", number)
            } else {
                ep.label.trim().to_string()
            };
            episodes.push(DiscoveredEpisode { number, label });
        }

        Ok(Listing {
            show_name: show_name_from_title(&self.manifest.title),
            season: self.manifest.season,
            episodes,
        })
    }

    async fn discover_candidate_sources(
        &self,
        _request: &DiscoveryRequest,
        episode: &DiscoveredEpisode,
    ) -> Result<Vec<DiscoveredSource>> {
        let found = self
            .manifest
            .episodes
            .iter()
            .enumerate()
            .find(|(i, ep)| Self::number_of(*i, ep) == episode.number)
            .map(|(_, ep)| ep);
        Ok(found
            .map(|ep| {
                ep.sources
                    .iter()
                    .map(|s| DiscoveredSource {
                        label: s.label.clone(),
                        urls: s.urls.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
