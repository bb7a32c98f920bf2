//! Final verification of a merged output file.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{ToolsConfig, VerifyConfig};
use crate::error::HarvestError;
use crate::media::{scan_resolution, Resolution};
use crate::process::{run_tool, ToolError};

/// Checks the real resolution of a finished download.
#[async_trait]
pub trait FinalVerifier: Send + Sync {
    /// Ok with the measured resolution when it meets `target_width`;
    /// otherwise `FinalResolutionMismatch` (actual is None when unreadable).
    async fn verify(&self, output: &Path, target_width: u32) -> Result<Resolution, HarvestError>;
}

/// Runs `ffprobe` on `input` (file path or URL) and parses `WIDTH,HEIGHT`.
/// Ok(None) when ffprobe ran but reported no usable video stream.
pub async fn ffprobe_resolution(
    ffprobe: &Path,
    input: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Option<Resolution>, ToolError> {
    let out = run_tool(
        ffprobe,
        [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0",
            input,
        ],
        None,
        Some(timeout),
        cancel,
    )
    .await?;
    if !out.success() {
        tracing::debug!(input, stderr = %out.tail(3), "ffprobe failed");
        return Ok(None);
    }
    Ok(Resolution::parse_csv(&out.stdout))
}

/// ffprobe first, `ffmpeg -i` output scan as fallback.
pub struct FfprobeVerifier {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfprobeVerifier {
    pub fn new(tools: &ToolsConfig, cfg: &VerifyConfig) -> Self {
        Self {
            ffprobe: tools.ffprobe.clone(),
            ffmpeg: tools.ffmpeg.clone(),
            timeout: cfg.timeout(),
        }
    }

    /// Best-effort resolution of a local media file.
    pub async fn read_resolution(&self, path: &Path) -> Option<Resolution> {
        let cancel = CancellationToken::new();
        let input = path.to_string_lossy();
        match ffprobe_resolution(&self.ffprobe, &input, self.timeout, &cancel).await {
            Ok(Some(res)) => return Some(res),
            Ok(None) => {}
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "ffprobe unavailable"),
        }

        // ffmpeg exits nonzero without an output file; only the banner matters.
        let args = [OsStr::new("-hide_banner"), OsStr::new("-i"), path.as_os_str()];
        match run_tool(&self.ffmpeg, args, None, Some(self.timeout), &cancel).await {
            Ok(out) => scan_resolution(&out.combined()),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ffmpeg fallback failed");
                None
            }
        }
    }
}

#[async_trait]
impl FinalVerifier for FfprobeVerifier {
    async fn verify(&self, output: &Path, target_width: u32) -> Result<Resolution, HarvestError> {
        let present = tokio::fs::metadata(output)
            .await
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !present {
            return Err(HarvestError::FinalResolutionMismatch {
                actual: None,
                target_width,
            });
        }

        match self.read_resolution(output).await {
            Some(res) if res.meets(target_width) => Ok(res),
            actual => Err(HarvestError::FinalResolutionMismatch {
                actual,
                target_width,
            }),
        }
    }
}
