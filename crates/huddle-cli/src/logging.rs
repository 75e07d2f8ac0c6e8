//! Tracing setup for the command line client.
//!
//! Warnings and errors go to stderr; everything the filter lets through is
//! also written to a daily log file under the huddle config directory.

use anyhow::{Context, Result};
use huddle_core::config::LogSettings;
use huddle_infrastructure::HuddlePaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Installs the global subscriber. Keep the guard alive until exit so the
/// file writer flushes.
pub fn init(settings: &LogSettings) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("Invalid logging.level")?;

    let log_dir = HuddlePaths::default()
        .log_dir()
        .context("Could not determine log directory")?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "huddle.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::debug!("[huddle] Logging to {}", log_dir.display());
    Ok(guard)
}
