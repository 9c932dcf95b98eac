// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-queue worker launcher: fork, chdir, environment assembly, rule
//! dispatch (spec §4.7).
//!
//! The forked child only runs the narrow [`child_entry`] path: fd
//! sanitisation, chdir, environment assembly, and handler dispatch. It
//! never returns — there is no post-fork window where arbitrary daemon
//! code (tracing's background flush thread in particular, which the fork
//! does not duplicate) might run (spec §9, "Fork + exec boundary").

use std::ffi::OsString;
use std::fs;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use std::process::Command;

use nix::errno::Errno;
use nix::sys::stat::fstat;
use nix::unistd::{chdir, close, fork, ForkResult};
use thiserror::Error;

use uevent_core::rule::RuleKind;
use uevent_core::{apply_bindings, parse_event, Pid, RuleSet};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("fork: {0}")]
    Fork(#[source] Errno),
}

/// Fork a worker for `queue_name` rooted at `queue_dir`. Returns the
/// child's pid; the child never returns here (spec §4.7 step 1).
pub fn spawn_worker(queue_name: &str, queue_dir: &Path, rules: &RuleSet) -> Result<Pid, WorkerError> {
    // Safety: single-threaded supervisor. The child path touches only
    // chdir/close/read/exec and plain owned Rust values, none of which
    // assume state that fork leaves behind in a broken condition.
    match unsafe { fork() }.map_err(WorkerError::Fork)? {
        ForkResult::Parent { child } => Ok(child.as_raw()),
        ForkResult::Child => {
            child_entry(queue_name, queue_dir, rules);
            std::process::exit(0);
        }
    }
}

struct EventSlot {
    name: String,
    bindings: Option<Vec<uevent_core::event::Binding>>,
}

fn child_entry(queue_name: &str, queue_dir: &Path, rules: &RuleSet) {
    match chdir(queue_dir) {
        Ok(()) => {}
        Err(Errno::ENOENT) | Err(Errno::ENOTDIR) => std::process::exit(0),
        Err(_) => std::process::exit(0),
    }

    let mut names = match list_regular_files(Path::new(".")) {
        Ok(names) => names,
        Err(_) => std::process::exit(0),
    };
    if names.is_empty() {
        std::process::exit(0);
    }
    names.sort();

    if !stdio_is_valid() {
        std::process::exit(1);
    }
    sanitize_fds();

    let base_event_env = event_base_vars(queue_name);
    let slots: Vec<EventSlot> = names
        .into_iter()
        .map(|name| {
            let bindings = fs::read(&name).ok().and_then(|data| parse_event(&data).ok());
            EventSlot { name, bindings }
        })
        .collect();

    for rule in rules.rules() {
        for slot in &slots {
            let Some(bindings) = &slot.bindings else {
                continue;
            };
            let mut env = apply_bindings(&base_event_env, bindings);
            env.push((OsString::from("EVENTNAME"), OsString::from(&slot.name)));
            invoke_rule(rule, &env, HandlerPhase::Event);
        }
    }

    let post_env = event_post_vars(queue_name);
    for rule in rules.rules() {
        invoke_rule(rule, &post_env, HandlerPhase::Post);
    }
}

enum HandlerPhase {
    Event,
    Post,
}

fn invoke_rule(rule: &uevent_core::Rule, env: &[(OsString, OsString)], phase: HandlerPhase) {
    match rule.kind {
        RuleKind::Shell => {
            let status = Command::new(&rule.path).env_clear().envs(env.iter().cloned()).status();
            if let Err(e) = status {
                // Not `tracing::error!`: the subscriber's background flush
                // thread isn't duplicated across fork, so writing straight
                // to stderr is the only reliable way to surface this here.
                eprintln!("handler invocation failed: rule={} error={e}", rule.path.display());
            }
        }
        RuleKind::Script => {
            if let Some(script) = &rule.script {
                match phase {
                    HandlerPhase::Event => script.run(),
                    HandlerPhase::Post => script.run_post(),
                }
            }
        }
    }
}

fn event_base_vars(queue_name: &str) -> Vec<(OsString, OsString)> {
    let mut env: Vec<(OsString, OsString)> = std::env::vars_os().collect();
    env.extend(uevent_core::env::worker_base_vars(queue_name));
    env
}

fn event_post_vars(queue_name: &str) -> Vec<(OsString, OsString)> {
    let mut env: Vec<(OsString, OsString)> = std::env::vars_os().collect();
    env.extend(uevent_core::env::worker_post_vars(queue_name));
    env
}

fn list_regular_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == ".dirty" {
            continue;
        }
        if entry.file_type()?.is_file() {
            names.push(name);
        }
    }
    Ok(names)
}

/// Check the queue directory for the rehash hook (spec §4.7 state machine:
/// `/.dirty` re-dirties the queue after the worker exits).
pub fn dirty_marker_present(queue_dir: &Path) -> bool {
    queue_dir.join(".dirty").is_file()
}

fn stdio_is_valid() -> bool {
    [0 as RawFd, 1 as RawFd, 2 as RawFd].iter().all(|fd| fstat(*fd).is_ok())
}

/// Close every fd above stderr. Best-effort: an already-closed fd is not an
/// error here.
fn sanitize_fds() {
    let max_fd = nix::unistd::sysconf(nix::unistd::SysconfVar::OPEN_MAX)
        .ok()
        .flatten()
        .unwrap_or(1024);
    for fd in 3..max_fd as RawFd {
        let _ = close(fd);
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
