//! `m3u8-harvest verify` – check a downloaded file's resolution.

use anyhow::Result;
use harvest_core::config::HarvestConfig;
use harvest_core::verify::{FfprobeVerifier, FinalVerifier};
use std::path::Path;

use super::REJECTED_EXIT_CODE;

pub async fn run_verify(cfg: &HarvestConfig, path: &Path, target_width: Option<u32>) -> Result<i32> {
    let target = target_width.unwrap_or(cfg.target_width);
    let verifier = FfprobeVerifier::new(&cfg.tools, &cfg.verify);

    match verifier.verify(path, target).await {
        Ok(res) => {
            println!("PASS {}  {}", res, path.display());
            Ok(0)
        }
        Err(e) => {
            println!("FAIL {}: {}", e.kind(), e);
            Ok(REJECTED_EXIT_CODE)
        }
    }
}
