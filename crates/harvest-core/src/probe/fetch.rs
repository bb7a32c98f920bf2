//! Blocking playlist GET via libcurl.

use std::fmt;
use std::time::Duration;

use crate::error::HarvestError;

/// Playlists rarely exceed a few hundred KiB; anything larger is not a playlist.
const MAX_PLAYLIST_BYTES: usize = 4 * 1024 * 1024;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Error from a single playlist fetch, kept separate so it can be classified.
#[derive(Debug)]
pub enum FetchError {
    Curl(curl::Error),
    Http(u32),
    TooLarge,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::TooLarge => write!(f, "response larger than {} bytes", MAX_PLAYLIST_BYTES),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            _ => None,
        }
    }
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        FetchError::Curl(e)
    }
}

/// Maps a fetch failure onto the probe taxonomy.
/// curl timeouts become `ProbeTimeout(limit)`; everything else is `ProbeUnavailable`.
pub fn classify(err: &FetchError, url: &str, limit: Duration) -> HarvestError {
    match err {
        FetchError::Curl(e) if e.is_operation_timedout() => HarvestError::ProbeTimeout(limit),
        other => HarvestError::ProbeUnavailable(format!("{}: {}", url, other)),
    }
}

/// GETs `url` and returns the body as text.
///
/// Follows redirects and skips TLS verification (stream hosts commonly serve
/// mismatched certificates). Runs in the current thread; call from
/// `spawn_blocking` in async code.
pub fn fetch_text(url: &str, timeout: Duration) -> Result<String, FetchError> {
    let mut body: Vec<u8> = Vec::new();
    let mut overflow = false;

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.ssl_verify_peer(false)?;
    easy.ssl_verify_host(false)?;
    easy.useragent(USER_AGENT)?;
    easy.connect_timeout(timeout)?;
    easy.timeout(timeout)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if body.len() + data.len() > MAX_PLAYLIST_BYTES {
                overflow = true;
                // Returning a short count aborts the transfer.
                return Ok(0);
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        if let Err(e) = transfer.perform() {
            drop(transfer);
            if overflow {
                return Err(FetchError::TooLarge);
            }
            return Err(FetchError::Curl(e));
        }
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_is_unavailable() {
        let err = classify(&FetchError::Http(404), "https://x/a.m3u8", Duration::from_secs(5));
        assert_eq!(
            err,
            HarvestError::ProbeUnavailable("https://x/a.m3u8: HTTP 404".into())
        );
    }

    #[test]
    fn oversize_is_unavailable() {
        let err = classify(&FetchError::TooLarge, "u", Duration::from_secs(5));
        assert_eq!(err.kind(), "probe_unavailable");
    }

    #[test]
    fn unreachable_host_is_unavailable() {
        let err = fetch_text("http://127.0.0.1:9/none.m3u8", Duration::from_secs(2)).unwrap_err();
        let mapped = classify(&err, "u", Duration::from_secs(2));
        assert!(mapped.is_candidate_failure());
    }
}
