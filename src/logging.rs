use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

pub const LOG_ENV: &str = "THOTH_LOG";

/// Builds the filter from `THOTH_LOG`, falling back to the configured level.
pub fn filter(cfg: &LogConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a file subscriber. The terminal belongs to the UI, so nothing
/// is written to stdout or stderr. Keep the guard alive for the whole run;
/// dropping it flushes pending lines.
pub fn init(cfg: &LogConfig) -> Result<Option<WorkerGuard>> {
    let Some(path) = cfg.file.as_deref() else {
        return Ok(None);
    };
    let (dir, name) = split_log_path(path)?;
    fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter(cfg))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("install log subscriber")?;

    tracing::info!(version = crate::VERSION, file = %path.display(), "logging started");
    Ok(Some(guard))
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir, name))
}
