// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fs::OpenOptions;
use std::io::Write;

use closure_core::NodeTable;
use closure_put::config::Config;
use closure_put::installer::{self, InstallOptions};
use closure_put::traversal::{self, lstat_probe};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Seed(#[from] closure_core::NodeTableError),
    #[error(transparent)]
    Traversal(#[from] traversal::TraversalError),
    #[error(transparent)]
    Install(#[from] installer::InstallError),
    #[error("open log {0}: {1}")]
    Log(std::path::PathBuf, #[source] std::io::Error),
}

fn main() {
    let config = Config::load();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(config.filter))
        .init();

    // Mirrors the original tool's `umask(0)`: destination modes are applied
    // exactly as recorded, not filtered by the caller's umask.
    nix::sys::stat::umask(nix::sys::stat::Mode::empty());

    if let Err(e) = run(&config) {
        tracing::error!(error = %e, "closure-put failed");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), AppError> {
    let prefix = config.prefix.as_deref();

    let mut table = NodeTable::new();
    for seed in &config.paths {
        table.append_fullpath(seed, prefix, lstat_probe)?;
    }

    traversal::run_traversal(&mut table, prefix, config.verbose)?;

    let opts = InstallOptions {
        destdir: &config.destdir,
        prefix,
        force: config.force,
        verbose: config.verbose,
    };

    if config.dry_run {
        tracing::warn!("dry run only");
        let lines = installer::dry_run_report(&table, &opts);
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        for line in lines {
            let _ = writeln!(handle, "{line}");
        }
        return Ok(());
    }

    let lines = installer::install(&table, &opts)?;

    if let Some(log_path) = &config.log {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| AppError::Log(log_path.clone(), e))?;
        for line in lines {
            let _ = writeln!(file, "{line}");
        }
    }

    Ok(())
}
