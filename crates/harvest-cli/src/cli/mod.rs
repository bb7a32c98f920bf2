//! CLI for the m3u8 episode harvester.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use harvest_core::config::{self, HarvestConfig};
use std::path::PathBuf;

use commands::{run_harvest, run_probe, run_verify};

/// Top-level CLI for m3u8-harvest.
#[derive(Debug, Parser)]
#[command(name = "m3u8-harvest")]
#[command(about = "Verify and download episode streams at the target resolution", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Harvest every episode of a listing.
    Run(RunArgs),

    /// Fast-probe a single stream URL.
    Probe {
        /// Playlist URL (master or media).
        url: String,
        /// Minimum accepted width in pixels.
        #[arg(long, value_name = "PX")]
        target_width: Option<u32>,
    },

    /// Check the resolution of a downloaded file.
    Verify {
        /// Path to the merged video file.
        path: PathBuf,
        /// Minimum accepted width in pixels.
        #[arg(long, value_name = "PX")]
        target_width: Option<u32>,
    },
}

/// Flags for `run`. Anything left unset comes from config.toml.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Listing manifest (JSON) with episodes and captured stream URLs.
    #[arg(long, value_name = "FILE")]
    pub manifest: PathBuf,

    /// Listing page address; must match the manifest's page_url when both are set.
    #[arg(long)]
    pub url: Option<String>,

    /// Output directory (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Episode pipelines running at once.
    #[arg(long, value_name = "N")]
    pub max_downloads: Option<usize>,

    /// Seconds to wait after each click.
    #[arg(long, value_name = "SECS")]
    pub wait: Option<f64>,

    /// CSS selector(s) for episode buttons.
    #[arg(long, value_name = "SEL")]
    pub episode_selector: Option<String>,

    /// Preferred source button text (e.g. FLV).
    #[arg(long, value_name = "TEXT")]
    pub source_text: Option<String>,

    /// Skip episodes numbered below N.
    #[arg(long, default_value = "1", value_name = "N")]
    pub start_episode: u32,

    /// Minimum accepted width in pixels.
    #[arg(long, value_name = "PX")]
    pub target_width: Option<u32>,

    /// Try at most N candidates per episode.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<usize>,

    /// Disable fast mode (no resource blocking while sniffing).
    #[arg(long)]
    pub no_fast: bool,

    /// Run the browser headless.
    #[arg(long)]
    pub headless: bool,

    /// Do not minimize a visible browser window.
    #[arg(long)]
    pub no_minimize: bool,

    /// Skip the start-up prompt.
    #[arg(long)]
    pub no_ui: bool,
}

impl RunArgs {
    /// `cfg` with this run's overrides applied.
    pub fn apply(&self, cfg: &HarvestConfig) -> HarvestConfig {
        let mut merged = cfg.clone();
        if let Some(n) = self.max_downloads {
            merged.max_concurrent = n.max(1);
        }
        if let Some(w) = self.wait {
            merged.click_wait_secs = w;
        }
        if let Some(sel) = &self.episode_selector {
            merged.episode_selector = sel.clone();
        }
        if let Some(text) = &self.source_text {
            merged.source_text = text.clone();
        }
        if let Some(px) = self.target_width {
            merged.target_width = px;
        }
        if let Some(n) = self.max_attempts {
            merged.max_candidate_attempts = Some(n);
        }
        if self.no_fast {
            merged.fast = false;
        }
        if self.headless {
            merged.headless = true;
        }
        if self.no_minimize {
            merged.minimize = false;
        }
        if self.no_ui {
            merged.show_ui = false;
        }
        merged
    }
}

impl CliCommand {
    /// Parses arguments, runs the command and returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run(args) => run_harvest(&cfg, args).await,
            CliCommand::Probe { url, target_width } => run_probe(&cfg, &url, target_width).await,
            CliCommand::Verify { path, target_width } => {
                run_verify(&cfg, &path, target_width).await
            }
        }
    }
}

#[cfg(test)]
mod tests;
