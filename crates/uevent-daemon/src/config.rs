// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface and resolved configuration (spec §6).

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_BASEDIR: &str = "/.initrd/uevent/queues";
pub const DEFAULT_RULESDIR: &str = "/lib/uevent/handlers";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// `uevented` — the queue daemon (spec §6 CLI (daemon)).
#[derive(Debug, Parser)]
#[command(name = "uevented", version, about = "Event queue daemon", long_about = None)]
pub struct Cli {
    /// Base directory containing queue subdirectories.
    #[arg(long, default_value = DEFAULT_BASEDIR)]
    pub basedir: PathBuf,

    /// Directory containing rule handler scripts.
    #[arg(long, default_value = DEFAULT_RULESDIR)]
    pub rulesdir: PathBuf,

    /// Path to write this process's pid.
    #[arg(long)]
    pub pidfile: Option<PathBuf>,

    /// Path to the log file. Ignored when --foreground is set (logs go to
    /// stderr instead).
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Log verbosity. Defaults to `error` before startup completes and
    /// `info` once the main loop is entered, if left unspecified.
    #[arg(long, value_enum)]
    pub loglevel: Option<LogLevel>,

    /// Stay attached to the controlling terminal and log to stderr.
    #[arg(long)]
    pub foreground: bool,
}

pub struct Config {
    pub basedir: PathBuf,
    pub rulesdir: PathBuf,
    pub pidfile: Option<PathBuf>,
    pub logfile: Option<PathBuf>,
    pub loglevel: Option<LogLevel>,
    pub foreground: bool,
}

impl Config {
    pub fn load() -> Self {
        let cli = Cli::parse();
        Self {
            basedir: cli.basedir,
            rulesdir: cli.rulesdir,
            pidfile: cli.pidfile,
            logfile: cli.logfile,
            loglevel: cli.loglevel,
            foreground: cli.foreground,
        }
    }

    /// Level to use once the main loop has been entered (spec §6: `info`
    /// if unspecified).
    pub fn running_loglevel(&self) -> LogLevel {
        self.loglevel.unwrap_or(LogLevel::Info)
    }
}
