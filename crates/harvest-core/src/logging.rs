//! Tracing setup for the harvester.
//!
//! Events go to an append-only file in the XDG state directory. When that
//! file cannot be opened the CLI calls [`init_logging_stderr`] instead so a
//! read-only home never stops a run.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = "m3u8-harvest";
const LOG_FILE_NAME: &str = "m3u8-harvest.log";

/// Filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "info,harvest_core=debug,m3u8_harvest=debug";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `$XDG_STATE_HOME/m3u8-harvest/m3u8-harvest.log`, creating the directory.
pub fn log_file_path() -> Result<PathBuf> {
    let state_dir = xdg::BaseDirectories::with_prefix(APP_DIR)?.get_state_home();
    fs::create_dir_all(&state_dir)
        .with_context(|| format!("create log dir {}", state_dir.display()))?;
    Ok(state_dir.join(LOG_FILE_NAME))
}

fn open_append(path: &Path) -> Result<File> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Installs the global subscriber writing to the state-dir log file.
///
/// Returns the log path. Errors leave no subscriber installed.
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = open_append(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {}", e))?;

    tracing::info!(path = %path.display(), "logging to file");
    Ok(path)
}

/// Installs a stderr subscriber. A subscriber that is already set is kept.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_valid() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn append_keeps_existing_lines() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        fs::write(&path, "earlier run\n").unwrap();
        let mut f = open_append(&path).unwrap();
        writeln!(f, "this run").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier run\nthis run\n");
    }

    #[test]
    fn unopenable_log_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_append(&dir.path().join("missing").join(LOG_FILE_NAME)).unwrap_err();
        assert!(format!("{:#}", err).contains("open log file"));
    }
}
