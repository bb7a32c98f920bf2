//! Pure playlist inspection over m3u8-rs.

use m3u8_rs::Playlist;
use url::Url;

use crate::media::Resolution;

/// One non-I-frame variant of a master playlist, URI resolved against the playlist URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub url: String,
    pub resolution: Option<Resolution>,
    pub bandwidth: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistInfo {
    Master(Vec<Variant>),
    /// Absolute segment URLs in playlist order.
    Media(Vec<String>),
}

/// Resolves a possibly relative URI against the playlist it came from.
pub fn resolve_uri(base: &str, uri: &str) -> Result<String, String> {
    let uri = uri.trim();
    if let Ok(abs) = Url::parse(uri) {
        return Ok(abs.to_string());
    }
    let base = Url::parse(base).map_err(|e| format!("bad playlist url {}: {}", base, e))?;
    base.join(uri)
        .map(|u| u.to_string())
        .map_err(|e| format!("bad uri {}: {}", uri, e))
}

fn to_resolution(r: &m3u8_rs::Resolution) -> Option<Resolution> {
    let width = u32::try_from(r.width).ok()?;
    let height = u32::try_from(r.height).ok()?;
    (width > 0 && height > 0).then(|| Resolution::new(width, height))
}

/// Parses playlist text fetched from `base_url`.
pub fn parse(text: &str, base_url: &str) -> Result<PlaylistInfo, String> {
    if !text.trim_start().starts_with("#EXTM3U") {
        return Err("response is not an M3U8 playlist".to_string());
    }
    let playlist = m3u8_rs::parse_playlist_res(text.as_bytes())
        .map_err(|e| format!("playlist parse error: {:?}", e))?;

    match playlist {
        Playlist::MasterPlaylist(master) => {
            let mut variants = Vec::new();
            for v in master.variants.iter().filter(|v| !v.is_i_frame) {
                variants.push(Variant {
                    url: resolve_uri(base_url, &v.uri)?,
                    resolution: v.resolution.as_ref().and_then(to_resolution),
                    bandwidth: v.bandwidth,
                });
            }
            if variants.is_empty() {
                return Err("master playlist has no variants".to_string());
            }
            Ok(PlaylistInfo::Master(variants))
        }
        Playlist::MediaPlaylist(media) => {
            let segments = media
                .segments
                .iter()
                .map(|s| resolve_uri(base_url, &s.uri))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(PlaylistInfo::Media(segments))
        }
    }
}

/// Variant with the largest pixel area among those declaring a resolution.
/// Ties keep the earlier variant.
pub fn best_variant(variants: &[Variant]) -> Option<(&Variant, Resolution)> {
    let mut best: Option<(&Variant, Resolution)> = None;
    for v in variants {
        let Some(res) = v.resolution else { continue };
        match best {
            Some((_, cur)) if cur.area() >= res.area() => {}
            _ => best = Some((v, res)),
        }
    }
    best
}
