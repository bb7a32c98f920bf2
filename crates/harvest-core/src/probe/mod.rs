//! Fast probe: cheap, time-bounded resolution check of a candidate stream.
//!
//! The playlist is fetched with libcurl. A master playlist that declares
//! `RESOLUTION` settles the question directly; otherwise the first few
//! segments are sampled with ffprobe. Every problem is reported as a
//! candidate failure so the orchestrator can move on.

mod fetch;
pub mod playlist;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{ProbeConfig, ToolsConfig};
use crate::error::HarvestError;
use crate::media::Resolution;
use crate::source::SourceCandidate;
use crate::verify::ffprobe_resolution;

pub use fetch::{fetch_text, FetchError};
use playlist::{best_variant, PlaylistInfo};

/// Successful probe outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub resolution: Resolution,
    /// URL to hand to the downloader; the chosen variant for master playlists.
    pub stream_url: String,
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(
        &self,
        candidate: &SourceCandidate,
        target_width: u32,
    ) -> Result<ProbeReport, HarvestError>;
}

/// Prober backed by libcurl playlist fetches and ffprobe segment sampling.
pub struct PlaylistProber {
    cfg: ProbeConfig,
    ffprobe: PathBuf,
}

impl PlaylistProber {
    pub fn new(cfg: ProbeConfig, tools: &ToolsConfig) -> Self {
        Self {
            cfg,
            ffprobe: tools.ffprobe.clone(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let limit = self.cfg.playlist_timeout();
        let owned = url.to_string();
        let res = tokio::task::spawn_blocking(move || fetch_text(&owned, limit))
            .await
            .map_err(|e| HarvestError::ProbeUnavailable(format!("fetch task: {}", e)))?;
        res.map_err(|e| fetch::classify(&e, url, limit))
    }

    async fn load(&self, url: &str) -> Result<PlaylistInfo, HarvestError> {
        let text = self.fetch(url).await?;
        playlist::parse(&text, url)
            .map_err(|e| HarvestError::ProbeUnavailable(format!("{}: {}", url, e)))
    }

    /// First segment among the leading `sample_segments` that ffprobe can read.
    async fn sample(&self, segments: &[String]) -> Option<Resolution> {
        let cancel = CancellationToken::new();
        let per_segment = self.cfg.playlist_timeout() * 2;
        for seg in segments.iter().take(self.cfg.sample_segments.max(1)) {
            match ffprobe_resolution(&self.ffprobe, seg, per_segment, &cancel).await {
                Ok(Some(res)) => return Some(res),
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(segment = %seg, error = %e, "segment sample failed");
                }
            }
        }
        None
    }

    async fn inspect(&self, url: &str) -> Result<ProbeReport, HarvestError> {
        let (stream_url, segments) = match self.load(url).await? {
            PlaylistInfo::Master(variants) => {
                if let Some((best, resolution)) = best_variant(&variants) {
                    return Ok(ProbeReport {
                        resolution,
                        stream_url: best.url.clone(),
                    });
                }
                let first = variants[0].url.clone();
                match self.load(&first).await? {
                    PlaylistInfo::Media(segments) => (first, segments),
                    PlaylistInfo::Master(_) => {
                        return Err(HarvestError::ProbeUnavailable(format!(
                            "{}: nested master playlist",
                            first
                        )))
                    }
                }
            }
            PlaylistInfo::Media(segments) => (url.to_string(), segments),
        };

        if segments.is_empty() {
            return Err(HarvestError::ProbeUnavailable(format!(
                "{}: playlist has no segments",
                stream_url
            )));
        }
        match self.sample(&segments).await {
            Some(resolution) => Ok(ProbeReport {
                resolution,
                stream_url,
            }),
            None => Err(HarvestError::ProbeUnavailable(format!(
                "{}: no resolution in sampled segments",
                stream_url
            ))),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.cfg.timeout()
    }
}

#[async_trait]
impl Prober for PlaylistProber {
    async fn probe(
        &self,
        candidate: &SourceCandidate,
        target_width: u32,
    ) -> Result<ProbeReport, HarvestError> {
        let limit = self.timeout();
        let report = tokio::time::timeout(limit, self.inspect(&candidate.url))
            .await
            .map_err(|_| HarvestError::ProbeTimeout(limit))??;

        if !report.resolution.meets(target_width) {
            return Err(HarvestError::ProbeResolutionMismatch {
                actual: report.resolution,
                target_width,
            });
        }
        tracing::debug!(
            candidate = %candidate.label,
            resolution = %report.resolution,
            stream = %report.stream_url,
            "probe passed"
        );
        Ok(report)
    }
}
