//! Merge downloaded `.ts` segments into one mp4 with ffmpeg.

use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::error::HarvestError;
use crate::process::{run_tool, tail_lines, ToolError};

pub const CONCAT_LIST_NAME: &str = "concat.txt";

/// Playlists the downloader may leave next to its segments.
const LOCAL_PLAYLISTS: &[&str] = &["raw.m3u8", "index.m3u8"];

/// All `.ts` files under `dir`, recursively, sorted by path.
pub async fn collect_segments(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let ft = entry.file_type().await?;
            if ft.is_dir() {
                stack.push(path);
            } else if ft.is_file()
                && path
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("ts"))
            {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// ffmpeg concat demuxer list: one `file '<path>'` line per segment.
pub fn concat_list(segments: &[PathBuf]) -> String {
    let mut s = String::new();
    for seg in segments {
        let p = seg.to_string_lossy().replace('\\', "/").replace('\'', r"'\''");
        s.push_str("file '");
        s.push_str(&p);
        s.push_str("'\n");
    }
    s
}

async fn local_playlist(tmp_dir: &Path) -> Option<PathBuf> {
    for name in LOCAL_PLAYLISTS {
        let p = tmp_dir.join(name);
        if tokio::fs::metadata(&p).await.map(|m| m.is_file()).unwrap_or(false) {
            return Some(p);
        }
    }
    None
}

fn tool_failure(e: ToolError) -> HarvestError {
    match e {
        ToolError::Cancelled { .. } => HarvestError::GlobalCancellation,
        other => HarvestError::DownloadToolFailure(other.to_string()),
    }
}

/// Merges the segments in `tmp_dir` into `output`.
///
/// The `.ts` segments must exist in every case. A local playlist left by the
/// downloader is then used directly when present (restricted to local files);
/// otherwise a concat list of every segment is written. Fails when there are
/// no segments, ffmpeg exits nonzero, or the output is missing or empty.
pub async fn merge_segments(
    ffmpeg: &Path,
    tmp_dir: &Path,
    output: &Path,
    cancel: &CancellationToken,
) -> Result<(), HarvestError> {
    let out_arg = output.to_string_lossy().into_owned();
    let segments = collect_segments(tmp_dir).await.map_err(|e| {
        HarvestError::DownloadToolFailure(format!("scan {}: {}", tmp_dir.display(), e))
    })?;
    if segments.is_empty() {
        return Err(HarvestError::DownloadToolFailure(
            "no ts segments found".to_string(),
        ));
    }

    let args: Vec<String> = match local_playlist(tmp_dir).await {
        // Local files only: the playlist must not pull segments from the network.
        Some(playlist) => vec![
            "-protocol_whitelist".into(),
            "file,crypto".into(),
            "-allowed_extensions".into(),
            "ALL".into(),
            "-i".into(),
            playlist.to_string_lossy().into_owned(),
        ],
        None => {
            tokio::fs::write(tmp_dir.join(CONCAT_LIST_NAME), concat_list(&segments))
                .await
                .map_err(|e| HarvestError::DownloadToolFailure(format!("write concat list: {}", e)))?;
            tracing::debug!(segments = segments.len(), dir = %tmp_dir.display(), "concat list written");
            vec![
                "-f".into(),
                "concat".into(),
                "-safe".into(),
                "0".into(),
                "-i".into(),
                CONCAT_LIST_NAME.into(),
            ]
        }
    };

    let args = args.into_iter().chain(
        ["-c", "copy", "-bsf:a", "aac_adtstoasc", "-y"]
            .into_iter()
            .map(String::from),
    );
    let args: Vec<String> = args.chain(std::iter::once(out_arg)).collect();

    let out = run_tool(ffmpeg, &args, Some(tmp_dir), None, cancel)
        .await
        .map_err(tool_failure)?;
    if !out.success() {
        return Err(HarvestError::DownloadToolFailure(format!(
            "ffmpeg merge exit {}: {}",
            out.status.code().unwrap_or(-1),
            tail_lines(&out.combined(), 6)
        )));
    }

    let size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(HarvestError::DownloadToolFailure(format!(
            "merged file {} missing or empty",
            output.display()
        )));
    }
    Ok(())
}
