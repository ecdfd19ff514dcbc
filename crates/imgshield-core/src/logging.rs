//! Tracing setup for the library and CLI.
//!
//! Events are appended to `$XDG_STATE_HOME/imgshield/imgshield.log`; when that
//! file cannot be opened the CLI switches to stderr. `RUST_LOG` replaces the
//! built-in filter.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,imgshield=debug,imgshield_core=debug,imgshield_cli=debug";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `~/.local/state/imgshield/imgshield.log` unless XDG says otherwise.
pub fn default_log_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("imgshield")?;
    Ok(dirs.get_state_home().join("imgshield").join("imgshield.log"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Send events to `path`. Fails if the file cannot be opened or a subscriber
/// is already installed.
pub fn init_logging_at(path: &Path) -> Result<()> {
    // `&File` is `Write`, so a shared handle serves every event.
    let file = Arc::new(open_log_file(path)?);
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(file)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("install log subscriber: {e}"))?;
    tracing::info!(path = %path.display(), "logging started");
    Ok(())
}

pub fn init_logging() -> Result<()> {
    init_logging_at(&default_log_path()?)
}

/// Stderr-only logging for when the log file is unavailable.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .try_init();
}
