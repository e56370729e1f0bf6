//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! - [`init_cli`]: human-readable stderr output for interactive runs.
//! - [`init_json_file`]: adds a daily-rotated JSON file layer for long
//!   analyses whose progress should be kept for later inspection.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file prefix; the appender adds a `.YYYY-MM-DD` suffix.
pub const LOG_FILE_PREFIX: &str = "rapport.log";

/// Holds the non-blocking writer guard for file logging.
///
/// Dropping it flushes pending log entries and closes the file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// `RUST_LOG` if set, otherwise `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Create `logs_dir` and a non-blocking daily-rotated writer into it.
///
/// Files are named `rapport.log.YYYY-MM-DD`. Events reach disk once the
/// returned guard is dropped or the background worker catches up.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created.
pub fn json_file_writer(logs_dir: &Path) -> anyhow::Result<(NonBlocking, LoggingGuard)> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    Ok((writer, LoggingGuard { _guard: guard }))
}

/// Install JSON file logging plus a stderr console layer.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_json_file(logs_dir: &Path, default_level: &str) -> anyhow::Result<LoggingGuard> {
    let (writer, guard) = json_file_writer(logs_dir)?;

    let json_layer = tracing_subscriber::fmt::layer().json().with_writer(writer);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

/// Initialise stderr-only logging for one-shot commands.
///
/// A second call is a no-op, so tests and embedders can call it freely.
pub fn init_cli(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init();
}
