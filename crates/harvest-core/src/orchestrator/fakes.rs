//! In-memory collaborators for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::downloader::{DownloadRequest, Downloader};
use crate::episode::{episode_file_name, Episode};
use crate::error::HarvestError;
use crate::media::Resolution;
use crate::probe::{ProbeReport, Prober};
use crate::source::SourceCandidate;
use crate::verify::FinalVerifier;

use super::Toolkit;

pub(crate) const FULL_HD: Resolution = Resolution {
    width: 1920,
    height: 1080,
};

/// Passes every URL at 1920x1080 unless told otherwise.
#[derive(Default)]
pub(crate) struct FakeProber {
    pub(crate) failures: HashMap<String, HarvestError>,
    pub(crate) delay: Duration,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakeProber {
    pub(crate) fn fail(mut self, url: &str, err: HarvestError) -> Self {
        self.failures.insert(url.to_string(), err);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(
        &self,
        candidate: &SourceCandidate,
        _target_width: u32,
    ) -> Result<ProbeReport, HarvestError> {
        self.calls.lock().unwrap().push(candidate.url.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.failures.get(&candidate.url) {
            Some(err) => Err(err.clone()),
            None => Ok(ProbeReport {
                resolution: FULL_HD,
                stream_url: candidate.url.clone(),
            }),
        }
    }
}

/// Writes the stream URL into the output file, so the verifier can tell sources apart.
#[derive(Default)]
pub(crate) struct FakeDownloader {
    pub(crate) failures: HashMap<String, HarvestError>,
    /// URLs that block until the stop signal fires.
    pub(crate) hang: HashSet<String>,
    pub(crate) delay: Duration,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub(crate) fn fail(mut self, url: &str, err: HarvestError) -> Self {
        self.failures.insert(url.to_string(), err);
        self
    }

    pub(crate) fn hang_on(mut self, url: &str) -> Self {
        self.hang.insert(url.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(
        &self,
        req: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, HarvestError> {
        self.calls.lock().unwrap().push(req.stream_url.clone());
        if let Some(parent) = req.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        // Partial file, as a real tool would leave mid-download.
        tokio::fs::write(&req.output_path, b"partial").await.unwrap();

        if self.hang.contains(&req.stream_url) {
            cancel.cancelled().await;
            let _ = tokio::fs::remove_file(&req.output_path).await;
            return Err(HarvestError::GlobalCancellation);
        }
        if !self.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = tokio::fs::remove_file(&req.output_path).await;
                    return Err(HarvestError::GlobalCancellation);
                }
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
        if let Some(err) = self.failures.get(&req.stream_url) {
            let _ = tokio::fs::remove_file(&req.output_path).await;
            return Err(err.clone());
        }
        tokio::fs::write(&req.output_path, req.stream_url.as_bytes())
            .await
            .unwrap();
        Ok(req.output_path.clone())
    }
}

/// Looks up the result by the URL written into the file by `FakeDownloader`.
#[derive(Default)]
pub(crate) struct FakeVerifier {
    pub(crate) results: HashMap<String, Resolution>,
    pub(crate) calls: Mutex<Vec<PathBuf>>,
}

impl FakeVerifier {
    pub(crate) fn measure(mut self, url: &str, res: Resolution) -> Self {
        self.results.insert(url.to_string(), res);
        self
    }

    pub(crate) fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FinalVerifier for FakeVerifier {
    async fn verify(&self, output: &Path, target_width: u32) -> Result<Resolution, HarvestError> {
        self.calls.lock().unwrap().push(output.to_path_buf());
        let Ok(url) = tokio::fs::read_to_string(output).await else {
            return Err(HarvestError::FinalResolutionMismatch {
                actual: None,
                target_width,
            });
        };
        let res = self.results.get(&url).copied().unwrap_or(FULL_HD);
        if res.meets(target_width) {
            Ok(res)
        } else {
            Err(HarvestError::FinalResolutionMismatch {
                actual: Some(res),
                target_width,
            })
        }
    }
}

pub(crate) struct Fakes {
    pub(crate) prober: Arc<FakeProber>,
    pub(crate) downloader: Arc<FakeDownloader>,
    pub(crate) verifier: Arc<FakeVerifier>,
}

impl Fakes {
    pub(crate) fn new(prober: FakeProber, downloader: FakeDownloader, verifier: FakeVerifier) -> Self {
        Self {
            prober: Arc::new(prober),
            downloader: Arc::new(downloader),
            verifier: Arc::new(verifier),
        }
    }

    pub(crate) fn toolkit(&self) -> Arc<Toolkit> {
        Arc::new(Toolkit {
            prober: self.prober.clone(),
            downloader: self.downloader.clone(),
            verifier: self.verifier.clone(),
        })
    }
}

/// Episode `number` with candidates given as (label, url), in discovery order.
pub(crate) fn episode(number: u32, sources: &[(&str, &str)]) -> Episode {
    Episode {
        number,
        label: format!("第{:02}集", number),
        candidates: sources
            .iter()
            .enumerate()
            .map(|(i, (label, url))| SourceCandidate::new(*label, *url, i))
            .collect(),
        file_name: episode_file_name("Show", 1, number),
    }
}
