//! Integration test: fast probe against a local HTTP server serving playlists.

mod common;

use std::time::Duration;

use common::playlist_server::{self, Route};
use harvest_core::config::{ProbeConfig, ToolsConfig};
use harvest_core::error::HarvestError;
use harvest_core::media::Resolution;
use harvest_core::probe::{PlaylistProber, Prober};
use harvest_core::source::SourceCandidate;

const MASTER_1080: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=1280x720\n\
720/index.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1920x1080\n\
1080/index.m3u8\n";

const MASTER_720: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=1280x720\n\
720/index.m3u8\n";

const MEDIA: &str = "#EXTM3U\n\
#EXT-X-TARGETDURATION:6\n\
#EXTINF:6.0,\n\
seg0.ts\n\
#EXTINF:6.0,\n\
seg1.ts\n\
#EXT-X-ENDLIST\n";

fn prober(cfg: ProbeConfig) -> PlaylistProber {
    PlaylistProber::new(cfg, &ToolsConfig::default())
}

fn candidate(url: String) -> SourceCandidate {
    SourceCandidate::new("海外推薦", url, 0)
}

#[tokio::test]
async fn master_playlist_resolution_passes() {
    let base = playlist_server::start(vec![("show/index.m3u8", Route::ok(MASTER_1080))]);
    let report = prober(ProbeConfig::default())
        .probe(&candidate(format!("{}show/index.m3u8", base)), 1920)
        .await
        .unwrap();
    assert_eq!(report.resolution, Resolution::new(1920, 1080));
    assert_eq!(report.stream_url, format!("{}show/1080/index.m3u8", base));
}

#[tokio::test]
async fn narrow_master_is_mismatch() {
    let base = playlist_server::start(vec![("index.m3u8", Route::ok(MASTER_720))]);
    let err = prober(ProbeConfig::default())
        .probe(&candidate(format!("{}index.m3u8", base)), 1920)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HarvestError::ProbeResolutionMismatch {
            actual: Resolution::new(1280, 720),
            target_width: 1920
        }
    );
}

#[tokio::test]
async fn http_error_is_unavailable() {
    let base = playlist_server::start(vec![("gone.m3u8", Route::status(403))]);
    let err = prober(ProbeConfig::default())
        .probe(&candidate(format!("{}gone.m3u8", base)), 1920)
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::ProbeUnavailable(ref m) if m.contains("HTTP 403")));
}

#[tokio::test]
async fn html_instead_of_playlist_is_unavailable() {
    let base = playlist_server::start(vec![("index.m3u8", Route::ok("<html>captcha</html>"))]);
    let err = prober(ProbeConfig::default())
        .probe(&candidate(format!("{}index.m3u8", base)), 1920)
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::ProbeUnavailable(_)));
}

#[tokio::test]
async fn stalled_host_times_out() {
    let base = playlist_server::start(vec![(
        "slow.m3u8",
        Route::ok(MASTER_1080).delayed(Duration::from_secs(4)),
    )]);
    let cfg = ProbeConfig {
        timeout_secs: 30,
        playlist_timeout_secs: 1,
        sample_segments: 3,
    };
    let err = prober(cfg)
        .probe(&candidate(format!("{}slow.m3u8", base)), 1920)
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::ProbeTimeout(_)), "got {:?}", err);
}

#[cfg(unix)]
#[tokio::test]
async fn media_playlist_is_sampled_with_ffprobe() {
    use std::os::unix::fs::PermissionsExt;

    let bin = tempfile::tempdir().unwrap();
    let ffprobe = bin.path().join("ffprobe");
    std::fs::write(&ffprobe, "#!/bin/sh\necho 1920,1080\n").unwrap();
    std::fs::set_permissions(&ffprobe, std::fs::Permissions::from_mode(0o755)).unwrap();

    let base = playlist_server::start(vec![("ep/index.m3u8", Route::ok(MEDIA))]);
    let tools = ToolsConfig {
        ffprobe,
        ..ToolsConfig::default()
    };
    let url = format!("{}ep/index.m3u8", base);
    let report = PlaylistProber::new(ProbeConfig::default(), &tools)
        .probe(&candidate(url.clone()), 1920)
        .await
        .unwrap();
    assert_eq!(report.resolution, Resolution::new(1920, 1080));
    assert_eq!(report.stream_url, url);
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_segments_are_unavailable() {
    use std::os::unix::fs::PermissionsExt;

    let bin = tempfile::tempdir().unwrap();
    let ffprobe = bin.path().join("ffprobe");
    std::fs::write(&ffprobe, "#!/bin/sh\necho 'Invalid data' 1>&2\nexit 1\n").unwrap();
    std::fs::set_permissions(&ffprobe, std::fs::Permissions::from_mode(0o755)).unwrap();

    let base = playlist_server::start(vec![("ep/index.m3u8", Route::ok(MEDIA))]);
    let tools = ToolsConfig {
        ffprobe,
        ..ToolsConfig::default()
    };
    let err = PlaylistProber::new(ProbeConfig::default(), &tools)
        .probe(&candidate(format!("{}ep/index.m3u8", base)), 1920)
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::ProbeUnavailable(ref m) if m.contains("no resolution")));
}
