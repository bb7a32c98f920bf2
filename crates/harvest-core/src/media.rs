//! Video resolution type and helpers for reading it out of tool output.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Width that counts as "1080p" when no target is configured.
pub const DEFAULT_TARGET_WIDTH: u32 = 1920;

/// Pixel dimensions of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when the stream is at least as wide as `target_width`.
    pub fn meets(&self, target_width: u32) -> bool {
        self.width >= target_width
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Parses ffprobe `-of csv=p=0` output for `stream=width,height`, e.g. `1920,1080`.
    /// Only the first non-empty line is considered.
    pub fn parse_csv(text: &str) -> Option<Self> {
        let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
        let mut parts = line.split(',');
        let width = parts.next()?.trim().parse::<u32>().ok()?;
        let height = parts.next()?.trim().parse::<u32>().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn video_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Video:.*?(\d{3,4})x(\d{3,4})").expect("static regex"))
}

fn any_dimensions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{3,4})x(\d{3,4})").expect("static regex"))
}

/// Scans free-form `ffmpeg -i` output for a `WIDTHxHEIGHT` pair.
///
/// A match on a `Video:` stream line wins; otherwise the first bare
/// `WIDTHxHEIGHT` anywhere in the text is used.
pub fn scan_resolution(text: &str) -> Option<Resolution> {
    let caps = video_line_re()
        .captures(text)
        .or_else(|| any_dimensions_re().captures(text))?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    Some(Resolution { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meets_compares_width_only() {
        assert!(Resolution::new(1920, 800).meets(1920));
        assert!(!Resolution::new(1280, 720).meets(1920));
        assert!(Resolution::new(3840, 2160).meets(1920));
    }

    #[test]
    fn parse_csv_first_line() {
        assert_eq!(
            Resolution::parse_csv("1920,1080\n"),
            Some(Resolution::new(1920, 1080))
        );
        assert_eq!(
            Resolution::parse_csv("\n 1280,720 \n640,360\n"),
            Some(Resolution::new(1280, 720))
        );
        assert_eq!(Resolution::parse_csv(""), None);
        assert_eq!(Resolution::parse_csv("N/A,N/A"), None);
        assert_eq!(Resolution::parse_csv("0,0"), None);
    }

    #[test]
    fn scan_prefers_video_line() {
        let out = "Input #0, mpegts, from 'seg.ts':\n  Duration: 00:00:06.00\n    Stream #0:0[0x100]: Video: h264 (High), yuv420p, 1920x1080 [SAR 1:1 DAR 16:9], 25 fps\n";
        assert_eq!(scan_resolution(out), Some(Resolution::new(1920, 1080)));
    }

    #[test]
    fn scan_falls_back_to_any_pair() {
        assert_eq!(
            scan_resolution("something 1280x720 else"),
            Some(Resolution::new(1280, 720))
        );
        assert_eq!(scan_resolution("no dimensions here"), None);
    }

    #[test]
    fn display_is_w_x_h() {
        assert_eq!(Resolution::new(1920, 1080).to_string(), "1920x1080");
    }
}
