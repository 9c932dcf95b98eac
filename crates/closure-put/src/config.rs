// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface (spec §6; original `initrd-put` option table).

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser};

/// `EX_USAGE` from sysexits.h: the exit code spec.md mandates for a CLI
/// invocation that fails argument parsing.
const EX_USAGE: i32 = 64;

#[derive(Debug, Parser)]
#[command(name = "closure-put", version, about = "Install the dependency closure of a set of paths into a destination tree")]
pub struct Cli {
    /// Remove existing files at the destination before installing.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Print what would be installed, without touching the filesystem.
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Append a record of installed files to this log.
    #[arg(short = 'l', long)]
    pub log: Option<PathBuf>,

    /// Ignore this path prefix when computing destination paths.
    #[arg(short = 'r', long = "remove-prefix")]
    pub remove_prefix: Option<PathBuf>,

    /// Print a message for each action; repeat for more detail.
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Directory the closure is installed into.
    pub destdir: PathBuf,

    /// Seed paths whose dependency closure should be installed.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

pub struct Config {
    pub destdir: PathBuf,
    pub paths: Vec<PathBuf>,
    pub prefix: Option<PathBuf>,
    pub force: bool,
    pub dry_run: bool,
    pub log: Option<PathBuf>,
    pub verbose: bool,
    pub filter: &'static str,
}

impl Config {
    pub fn load() -> Self {
        let cli = match Cli::try_parse() {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                match e.kind() {
                    ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => std::process::exit(0),
                    _ => std::process::exit(EX_USAGE),
                }
            }
        };
        let filter = match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        Self {
            destdir: cli.destdir,
            paths: cli.paths,
            prefix: cli.remove_prefix,
            force: cli.force,
            dry_run: cli.dry_run,
            log: cli.log,
            verbose: cli.verbose > 0,
            filter,
        }
    }
}
