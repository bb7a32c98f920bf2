//! `m3u8-harvest probe` – fast-probe one stream URL.

use anyhow::Result;
use harvest_core::config::HarvestConfig;
use harvest_core::probe::{PlaylistProber, Prober};
use harvest_core::source::SourceCandidate;

use super::REJECTED_EXIT_CODE;

pub async fn run_probe(cfg: &HarvestConfig, url: &str, target_width: Option<u32>) -> Result<i32> {
    let target = target_width.unwrap_or(cfg.target_width);
    let prober = PlaylistProber::new(cfg.probe.clone(), &cfg.tools);
    let candidate = SourceCandidate::new("cli", url, 0);

    match prober.probe(&candidate, target).await {
        Ok(report) => {
            println!("PASS {}  {}", report.resolution, report.stream_url);
            Ok(0)
        }
        Err(e) => {
            tracing::info!(url, kind = e.kind(), "probe rejected");
            println!("FAIL {}: {}", e.kind(), e);
            Ok(REJECTED_EXIT_CODE)
        }
    }
}
