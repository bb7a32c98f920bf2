//! Full download of a probed stream through external tools.
//!
//! N_m3u8DL-RE fetches the segments into a private temp dir (merge skipped),
//! then ffmpeg joins them into the episode's output file. Either step can be
//! cancelled; the child process is killed and the partial output removed.

mod classify;
pub mod merge;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::ToolsConfig;
use crate::error::HarvestError;
use crate::process::{run_tool, ToolError};

pub use classify::{classify_run, Verdict};

/// Directory under the output dir holding per-attempt temp dirs.
pub const TEMP_ROOT_NAME: &str = "nm3_tmp";

/// Extra flags tried in order, moving on only when the previous set was rejected.
const FLAG_SETS: &[&[&str]] = &[&[], &["--quiet"], &["--log-level", "error"]];

/// One full download of one candidate for one episode.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub episode: u32,
    /// Probe-resolved stream URL.
    pub stream_url: String,
    pub output_path: PathBuf,
}

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Produces the merged file at `req.output_path` and returns its path.
    /// Cancellation yields `GlobalCancellation` and leaves no partial output.
    async fn download(
        &self,
        req: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, HarvestError>;
}

pub fn temp_root(out_dir: &Path) -> PathBuf {
    out_dir.join(TEMP_ROOT_NAME)
}

/// `nm3_tmp_<stem>_<UTC %Y%m%d%H%M%S>` under the temp root.
pub fn attempt_dir(out_dir: &Path, stem: &str) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    temp_root(out_dir).join(format!("{}_{}_{}", TEMP_ROOT_NAME, stem, stamp))
}

fn tool_failure(e: ToolError) -> HarvestError {
    match e {
        ToolError::Cancelled { .. } => HarvestError::GlobalCancellation,
        other => HarvestError::DownloadToolFailure(other.to_string()),
    }
}

/// N_m3u8DL-RE + ffmpeg downloader.
pub struct ExternalDownloader {
    downloader: PathBuf,
    ffmpeg: PathBuf,
    clean_temp: bool,
}

impl ExternalDownloader {
    pub fn new(tools: &ToolsConfig, clean_temp: bool) -> Self {
        Self {
            downloader: tools.downloader.clone(),
            ffmpeg: tools.ffmpeg.clone(),
            clean_temp,
        }
    }

    async fn fetch_segments(
        &self,
        req: &DownloadRequest,
        save_dir: &Path,
        stem: &str,
        tmp_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), HarvestError> {
        let base: Vec<String> = vec![
            req.stream_url.clone(),
            "--save-dir".into(),
            save_dir.to_string_lossy().into_owned(),
            "--save-name".into(),
            stem.to_string(),
            "--skip-merge".into(),
            "--tmp-dir".into(),
            tmp_dir.to_string_lossy().into_owned(),
            "--no-log".into(),
        ];

        for extra in FLAG_SETS {
            let args = base.iter().map(String::as_str).chain(extra.iter().copied());
            let out = run_tool(&self.downloader, args, None, None, cancel)
                .await
                .map_err(tool_failure)?;
            match classify_run(&out) {
                Verdict::Success => return Ok(()),
                Verdict::RejectedArguments => {
                    tracing::debug!(episode = req.episode, flags = ?extra, "downloader rejected flags");
                }
                Verdict::Failed(reason) => return Err(HarvestError::DownloadToolFailure(reason)),
            }
        }
        Err(HarvestError::DownloadToolFailure(
            "downloader rejected every flag set".to_string(),
        ))
    }

    async fn attempt(
        &self,
        req: &DownloadRequest,
        tmp_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), HarvestError> {
        let save_dir = req.output_path.parent().unwrap_or(Path::new("."));
        let stem = output_stem(&req.output_path);
        tokio::fs::create_dir_all(tmp_dir).await.map_err(|e| {
            HarvestError::DownloadToolFailure(format!("create {}: {}", tmp_dir.display(), e))
        })?;

        self.fetch_segments(req, save_dir, &stem, tmp_dir, cancel)
            .await?;
        merge::merge_segments(&self.ffmpeg, tmp_dir, &req.output_path, cancel).await
    }
}

fn output_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "episode".to_string())
}

#[async_trait]
impl Downloader for ExternalDownloader {
    async fn download(
        &self,
        req: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, HarvestError> {
        let save_dir = req.output_path.parent().unwrap_or(Path::new("."));
        let tmp_dir = attempt_dir(save_dir, &output_stem(&req.output_path));

        let result = self.attempt(req, &tmp_dir, cancel).await;
        match &result {
            Ok(()) => {
                if self.clean_temp {
                    let _ = tokio::fs::remove_dir_all(&tmp_dir).await;
                }
            }
            Err(e) => {
                tracing::debug!(episode = req.episode, error = %e, "download attempt failed, cleaning up");
                let _ = tokio::fs::remove_dir_all(&tmp_dir).await;
                let _ = tokio::fs::remove_file(&req.output_path).await;
            }
        }
        result.map(|()| req.output_path.clone())
    }
}
