use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::ForgeConfig;

const DEFAULT_FILTER: &str = "info,forge_app=debug,forge_token=debug,forge_core=debug";

/// Initializes the logging system with file + console output under
/// `~/.tokenforge/logs`. `level` is the configured filter, used when
/// `RUST_LOG` is unset.
/// Returns a guard that must be kept alive for the duration of the process.
pub fn init_logging(level: &str) -> Result<WorkerGuard> {
    init_logging_in(&ForgeConfig::logs_dir()?, level)
}

/// Same as [`init_logging`] but writes log files into `logs_dir`.
pub fn init_logging_in(logs_dir: &Path, level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    // File appender: daily rotation
    let file_appender = tracing_appender::rolling::daily(logs_dir, "tokenforge");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}

/// Directives for the configured level. Blank or unparseable levels fall
/// back to the built-in filter.
fn filter_directives(level: &str) -> &str {
    let level = level.trim();
    if level.is_empty() || EnvFilter::try_new(level).is_err() {
        DEFAULT_FILTER
    } else {
        level
    }
}
