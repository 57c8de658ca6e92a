//! Logging initialization.
//!
//! Sets up structured logging with tracing, pretty or JSON, optionally to a file.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging to stderr.
pub fn init_telemetry(log_level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().pretty().with_writer(std::io::stderr)).try_init()?,
    }

    Ok(())
}

/// Initialize logging appended to `log_file`.
///
/// Buffered lines are flushed when the returned guard is dropped, so the
/// caller must hold it until the last log call.
pub fn init_telemetry_with_file(
    log_level: &str,
    format: LogFormat,
    log_file: &Path,
) -> anyhow::Result<WorkerGuard> {
    let filter = EnvFilter::try_new(log_level)?;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(non_blocking)).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().with_ansi(false).with_writer(non_blocking)).try_init()?,
    }

    Ok(guard)
}

/// Initialize from the `[logging]` config section. Returns the file
/// writer's guard when logging to a file.
pub fn init_from_config(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    match &config.log_file {
        Some(path) => init_telemetry_with_file(&config.level, config.format, path).map(Some),
        None => init_telemetry(&config.level, config.format).map(|()| None),
    }
}
