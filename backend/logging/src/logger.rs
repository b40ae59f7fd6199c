//! Structured Logger
//!
//! Wraps `tracing` with console output on stderr (plain or JSON), an
//! optional daily rolling NDJSON file, and environment-based level control.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix of the rolling log, e.g. `heatlens.log.2024-05-01`.
const LOG_FILE_PREFIX: &str = "heatlens.log";

/// Build an `EnvFilter`; `RUST_LOG` wins over the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global structured logger.
///
/// Returns `Ok(false)` if a global subscriber was already installed, which
/// happens when several tests or embedders initialize logging.
pub fn init_logger(log_dir: Option<&Path>, level: &str, json: bool) -> Result<bool> {
    let file_layer = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .build(dir)
                .with_context(|| format!("Failed to open log directory: {}", dir.display()))?;
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    let console_plain = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
    });
    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    let installed = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console_plain)
        .with(console_json)
        .with(file_layer)
        .try_init()
        .is_ok();
    Ok(installed)
}
