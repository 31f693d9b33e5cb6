//! Tracing setup.
//!
//! The TUI owns the terminal, so it logs to a file. Headless modes log to
//! stderr and keep stdout for results.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "POLYPI_LOG";

pub enum LogTarget<'a> {
    File(&'a Path),
    Stderr,
}

/// `POLYPI_LOG`, then `RUST_LOG`, then `default`.
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("polypi-dash")
        .join("polypi-dash.log")
}

pub fn init(target: LogTarget<'_>) -> Result<()> {
    match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create log directory {}", parent.display()))?;
            }
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            // A second init (tests, embedding) keeps the first subscriber.
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter("info"))
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file))
                .try_init();
        }
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter("warn"))
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    Ok(())
}
