// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup: file sink when daemonized, stderr when
//! `--foreground` (spec §7, "ambient stack" logging transport).

use std::path::Path;

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, LogLevel};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("create log directory {0}: {1}")]
    CreateDir(std::path::PathBuf, std::io::Error),
    #[error("--logfile is required unless --foreground is set")]
    MissingLogfile,
}

/// Guard that must be held for the process lifetime; dropping it stops the
/// non-blocking file writer from flushing further records.
pub enum LogGuard {
    File(tracing_appender::non_blocking::WorkerGuard),
    Stderr,
}

pub fn setup_logging(config: &Config, level: LogLevel) -> Result<LogGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()));

    if config.foreground {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(LogGuard::Stderr);
    }

    let logfile = config.logfile.as_deref().ok_or(LoggingError::MissingLogfile)?;
    create_parent_dir(logfile)?;

    let dir = logfile.parent().unwrap_or_else(|| Path::new("."));
    let file_name = logfile.file_name().unwrap_or_else(|| logfile.as_os_str());
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(LogGuard::File(guard))
}

fn create_parent_dir(path: &Path) -> Result<(), LoggingError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| LoggingError::CreateDir(parent.to_path_buf(), e))?;
        }
    }
    Ok(())
}
