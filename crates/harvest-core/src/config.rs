use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::media::DEFAULT_TARGET_WIDTH;

/// Episode button selector tried on listing pages (comma-separated fallbacks).
pub const DEFAULT_EPISODE_SELECTOR: &str = ".jujiepisodios a, .module-play-list-content a, .play-list-box a, .playlist a, .episodes a, .episode-list a, .video_page_playlist a, .player_list a, .video-list a";

/// Fast probe limits (optional `[probe]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Hard limit for the whole probe of one candidate.
    pub timeout_secs: u64,
    /// Limit for fetching a single playlist.
    pub playlist_timeout_secs: u64,
    /// How many leading segments to sample when the playlist has no RESOLUTION.
    pub sample_segments: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            playlist_timeout_secs: 5,
            sample_segments: 3,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn playlist_timeout(&self) -> Duration {
        Duration::from_secs(self.playlist_timeout_secs.max(1))
    }
}

/// Final verification limits (optional `[verify]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub timeout_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl VerifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// External tool locations (optional `[tools]` section). Bare names are looked up on PATH.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Segment downloader (N_m3u8DL-RE).
    pub downloader: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            downloader: PathBuf::from("N_m3u8DL-RE"),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Global configuration loaded from `~/.config/m3u8-harvest/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Episode pipelines running at once.
    pub max_concurrent: usize,
    /// Minimum accepted video width (1920 = 1080p).
    pub target_width: u32,
    /// Cap on candidates tried per episode; unset means all of them.
    #[serde(default)]
    pub max_candidate_attempts: Option<usize>,
    /// Seconds to wait after each click for stream requests to appear.
    pub click_wait_secs: f64,
    /// CSS selector(s) for episode buttons.
    pub episode_selector: String,
    /// Preferred source-button text (e.g. "FLV"); empty means no preference.
    pub source_text: String,
    /// Fast mode: headless browsing with heavy resources blocked.
    pub fast: bool,
    pub headless: bool,
    /// Minimize a visible browser window on launch.
    pub minimize: bool,
    /// Show the start-up prompt when no URL is given.
    pub show_ui: bool,
    /// Remove per-attempt temp directories after a successful merge.
    pub clean_temp: bool,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            target_width: DEFAULT_TARGET_WIDTH,
            max_candidate_attempts: None,
            click_wait_secs: 2.0,
            episode_selector: DEFAULT_EPISODE_SELECTOR.to_string(),
            source_text: "FLV".to_string(),
            fast: true,
            headless: false,
            minimize: true,
            show_ui: true,
            clean_temp: true,
            probe: ProbeConfig::default(),
            verify: VerifyConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Negative and NaN waits are zero; values too large for a `Duration` saturate.
    pub fn click_wait(&self) -> Duration {
        Duration::try_from_secs_f64(self.click_wait_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Preferred source text, or None when empty.
    pub fn preferred_source(&self) -> Option<&str> {
        let s = self.source_text.trim();
        (!s.is_empty()).then_some(s)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("m3u8-harvest")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HarvestConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Like `load_or_init` for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<HarvestConfig> {
    if !path.exists() {
        let default_cfg = HarvestConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: HarvestConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.max_concurrent, 5);
        assert_eq!(cfg.target_width, 1920);
        assert_eq!(cfg.probe.timeout_secs, 30);
        assert_eq!(cfg.verify.timeout_secs, 10);
        assert_eq!(cfg.tools.downloader, PathBuf::from("N_m3u8DL-RE"));
        assert!(cfg.max_candidate_attempts.is_none());
        assert_eq!(cfg.preferred_source(), Some("FLV"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = HarvestConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: HarvestConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            max_concurrent = 2
            target_width = 1280
            max_candidate_attempts = 4
            click_wait_secs = 0.5
            episode_selector = ".eps a"
            source_text = ""
            fast = false
            headless = true
            minimize = false
            show_ui = false
            clean_temp = false

            [probe]
            timeout_secs = 12

            [tools]
            ffprobe = "/opt/ff/ffprobe"
        "#;
        let cfg: HarvestConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent, 2);
        assert_eq!(cfg.target_width, 1280);
        assert_eq!(cfg.max_candidate_attempts, Some(4));
        assert_eq!(cfg.click_wait(), Duration::from_millis(500));
        assert!(cfg.preferred_source().is_none());
        assert_eq!(cfg.probe.timeout_secs, 12);
        assert_eq!(cfg.probe.sample_segments, 3);
        assert_eq!(cfg.verify, VerifyConfig::default());
        assert_eq!(cfg.tools.ffprobe, PathBuf::from("/opt/ff/ffprobe"));
        assert_eq!(cfg.tools.ffmpeg, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn click_wait_never_panics() {
        let mut cfg = HarvestConfig::default();
        cfg.click_wait_secs = f64::INFINITY;
        assert_eq!(cfg.click_wait(), Duration::MAX);
        cfg.click_wait_secs = 1e300;
        assert_eq!(cfg.click_wait(), Duration::MAX);
        cfg.click_wait_secs = -3.0;
        assert_eq!(cfg.click_wait(), Duration::ZERO);
        cfg.click_wait_secs = f64::NAN;
        assert_eq!(cfg.click_wait(), Duration::ZERO);
    }

    #[test]
    fn load_or_init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg, HarvestConfig::default());
        assert!(path.exists());
        let again = load_or_init_at(&path).unwrap();
        assert_eq!(again, cfg);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_concurrent = \"many\"").unwrap();
        assert!(load_or_init_at(&path).is_err());
    }
}
