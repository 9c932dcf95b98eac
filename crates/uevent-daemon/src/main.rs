// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! uevented — event queue daemon.
//!
//! Watches a base directory of queue subdirectories, dispatches dirty
//! queues to forked workers, and hot-reloads rule handlers on change.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use uevent_daemon::config::Config;
use uevent_daemon::logging::setup_logging;
use uevent_daemon::supervisor::Supervisor;

fn main() {
    let config = Config::load();

    // Startup validation happens before logging is initialised, so a
    // misconfigured basedir/rulesdir is reported on stderr directly —
    // this is the "error" pre-init loglevel from spec.md §6 in practice.
    if let Err(e) = uevent_daemon::supervisor::validate_directories(&config.basedir, &config.rulesdir) {
        eprintln!("uevented: {e}");
        std::process::exit(1);
    }

    let level = config.running_loglevel();
    let _log_guard = match setup_logging(&config, level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("uevented: failed to set up logging: {e}");
            std::process::exit(1);
        }
    };

    if let Some(pidfile) = &config.pidfile {
        if let Err(e) = write_pidfile(pidfile) {
            error!("failed to write pidfile {}: {}", pidfile.display(), e);
            std::process::exit(1);
        }
    }

    info!(basedir = %config.basedir.display(), rulesdir = %config.rulesdir.display(), "starting uevented");

    let result = Supervisor::start(config.basedir.clone(), config.rulesdir.clone()).and_then(|mut supervisor| supervisor.run());

    if let Some(pidfile) = &config.pidfile {
        remove_pidfile(pidfile);
    }

    if let Err(e) = result {
        error!("uevented exiting with error: {e}");
        std::process::exit(1);
    }

    info!("uevented exiting");
}

fn write_pidfile(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{}\n", std::process::id()))
}

fn remove_pidfile(path: &PathBuf) {
    let _ = std::fs::remove_file(path);
}
