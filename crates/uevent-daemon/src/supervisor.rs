// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor loop: wires the multiplexer, signal source, directory
//! watchers, queue set, rule set and worker launcher together (spec §4.8).

use std::collections::HashMap;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

use nix::sys::epoll::EpollFlags;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid as NixPid;
use thiserror::Error;

use uevent_core::{QueueInfo, QueueSet, RuleScanError, RuleSet};

use crate::mux::{Mux, MuxError};
use crate::signals::{SignalError, SignalEvent, SignalSource};
use crate::watcher::{basedir_mask, queue_mask, rulesdir_mask, DirWatcher, WatcherError};
use crate::worker::{self, WorkerError};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error(transparent)]
    Mux(#[from] MuxError),
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Watcher(#[from] WatcherError),
    #[error(transparent)]
    RuleScan(#[from] RuleScanError),
    #[error("become subreaper: {0}")]
    Subreaper(#[source] nix::Error),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Startup validation (spec.md §4.5 expects these dirs already exist;
/// SPEC_FULL.md §2 makes the check explicit and fatal).
pub fn validate_directories(basedir: &Path, rulesdir: &Path) -> Result<(), SupervisorError> {
    for dir in [basedir, rulesdir] {
        if !dir.is_dir() {
            return Err(SupervisorError::NotADirectory(dir.to_path_buf()));
        }
    }
    Ok(())
}

/// Become a subreaper and ask to die if the parent does, so orphaned
/// workers cannot escape supervision (spec §4.8 initialisation).
pub fn become_subreaper() -> Result<(), SupervisorError> {
    let rc = unsafe { libc::prctl(libc::PR_SET_CHILD_SUBREAPER, 1, 0, 0, 0) };
    if rc != 0 {
        return Err(SupervisorError::Subreaper(nix::Error::last()));
    }
    let rc = unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL, 0, 0, 0) };
    if rc != 0 {
        return Err(SupervisorError::Subreaper(nix::Error::last()));
    }
    Ok(())
}

const POLL_TIMEOUT_MS: i32 = 500;
const MAX_READY_EVENTS: usize = 64;

enum Source {
    Signal,
    Basedir,
    Rulesdir,
    Queue(String),
}

pub struct Supervisor {
    basedir: PathBuf,
    rulesdir: PathBuf,
    mux: Mux,
    signals: SignalSource,
    basedir_watcher: DirWatcher,
    rulesdir_watcher: DirWatcher,
    queue_watchers: HashMap<RawFd, DirWatcher>,
    sources: HashMap<RawFd, Source>,
    queues: QueueSet,
    rules: RuleSet,
    shutting_down: bool,
}

impl Supervisor {
    pub fn start(basedir: PathBuf, rulesdir: PathBuf) -> Result<Self, SupervisorError> {
        validate_directories(&basedir, &rulesdir)?;
        become_subreaper()?;

        // Exported at process scope in addition to being injected per
        // worker below (spec.md §6 env table; SPEC_FULL.md §2 supplement).
        std::env::set_var("BASEDIR", &basedir);
        std::env::set_var("RULESDIR", &rulesdir);

        let mut mux = Mux::new()?;
        let mut sources = HashMap::new();

        let signals = SignalSource::new()?;
        let signal_fd = mux.add(signals.dup_for_mux()?, EpollFlags::EPOLLIN)?;
        sources.insert(signal_fd, Source::Signal);

        let basedir_watcher = DirWatcher::new(&basedir, basedir_mask())?;
        let basedir_fd = mux.add(basedir_watcher.dup_for_mux()?, EpollFlags::EPOLLIN)?;
        sources.insert(basedir_fd, Source::Basedir);

        let rulesdir_watcher = DirWatcher::new(&rulesdir, rulesdir_mask())?;
        let rulesdir_fd = mux.add(rulesdir_watcher.dup_for_mux()?, EpollFlags::EPOLLIN)?;
        sources.insert(rulesdir_fd, Source::Rulesdir);

        let rules = RuleSet::scan(&rulesdir, None)?;

        let mut supervisor = Self {
            basedir,
            rulesdir,
            mux,
            signals,
            basedir_watcher,
            rulesdir_watcher,
            queue_watchers: HashMap::new(),
            sources,
            queues: QueueSet::new(),
            rules,
            shutting_down: false,
        };
        supervisor.reconcile_queues()?;
        Ok(supervisor)
    }

    pub fn run(&mut self) -> Result<(), SupervisorError> {
        while !self.mux.is_closed() {
            self.step()?;
        }
        self.shutdown();
        Ok(())
    }

    fn step(&mut self) -> Result<(), SupervisorError> {
        let ready = self.mux.wait(POLL_TIMEOUT_MS, MAX_READY_EVENTS)?;

        for (fd, _mask) in ready {
            let Some(source) = self.sources.get(&fd) else { continue };
            match source {
                Source::Signal => self.handle_signal()?,
                Source::Basedir => {
                    self.basedir_watcher.drain()?;
                    self.reconcile_queues()?;
                }
                Source::Rulesdir => {
                    self.rulesdir_watcher.drain()?;
                    self.rules = RuleSet::scan(&self.rulesdir, None)?;
                    tracing::info!("reloaded rules");
                }
                Source::Queue(name) => {
                    if let Some(watcher) = self.queue_watchers.get(&fd) {
                        watcher.drain()?;
                    }
                    if let Some(queue) = self.queues.get_mut(name) {
                        queue.dirty = true;
                    }
                }
            }
        }

        self.launch_dirty_workers()?;
        Ok(())
    }

    fn handle_signal(&mut self) -> Result<(), SupervisorError> {
        for event in self.signals.drain()? {
            match event {
                SignalEvent::ChildExited => self.reap_children(),
                SignalEvent::Interrupt | SignalEvent::Terminate => {
                    tracing::info!("shutdown requested");
                    self.shutting_down = true;
                    self.mux.close();
                }
                SignalEvent::Hangup => tracing::debug!("SIGHUP observed, no action"),
            }
        }
        Ok(())
    }

    fn reap_children(&mut self) {
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(nix::errno::Errno::ECHILD) => break,
                Ok(status) => {
                    if let Some(pid) = status_pid(&status) {
                        if let Some(queue) = self.queues.iter_mut().find(|q| q.worker == Some(pid.as_raw())) {
                            queue.worker = None;
                        }
                    }
                }
                Err(_) => break,
            }
        }
    }

    fn launch_dirty_workers(&mut self) -> Result<(), SupervisorError> {
        let to_launch: Vec<String> = self
            .queues
            .iter()
            .filter(|q| q.dirty && q.worker.is_none())
            .map(|q| q.name.clone())
            .collect();

        for name in to_launch {
            let queue_dir = self.basedir.join(&name);
            let pid = worker::spawn_worker(&name, &queue_dir, &self.rules)?;
            if let Some(queue) = self.queues.get_mut(&name) {
                queue.worker = Some(pid);
                queue.dirty = worker::dirty_marker_present(&queue_dir);
            }
        }
        Ok(())
    }

    fn reconcile_queues(&mut self) -> Result<(), SupervisorError> {
        let listing = list_queue_infos(&self.basedir);

        let basedir = self.basedir.clone();
        let mux = &mut self.mux;
        let queue_watchers = &mut self.queue_watchers;
        let sources = &mut self.sources;

        self.queues.reconcile(
            &listing,
            |name| match register_queue_watcher(&basedir, name, mux) {
                Ok((fd, watcher)) => {
                    queue_watchers.insert(fd, watcher);
                    sources.insert(fd, Source::Queue(name.to_string()));
                    fd
                }
                Err(e) => {
                    tracing::error!(queue = %name, error = %e, "failed to watch queue directory");
                    -1
                }
            },
            |watch| {
                queue_watchers.remove(&watch);
                sources.remove(&watch);
                let _ = mux.remove(watch);
            },
        );
        Ok(())
    }

    fn shutdown(&mut self) {
        self.queue_watchers.clear();
        tracing::info!("supervisor shutdown complete");
    }
}

fn register_queue_watcher(basedir: &Path, name: &str, mux: &mut Mux) -> Result<(RawFd, DirWatcher), WatcherError> {
    let watcher = DirWatcher::new(&basedir.join(name), queue_mask())?;
    let dup = watcher.dup_for_mux()?;
    let fd = mux
        .add(dup, EpollFlags::EPOLLIN)
        .map_err(|_| WatcherError::Read(nix::errno::Errno::EIO))?;
    Ok((fd, watcher))
}

fn status_pid(status: &WaitStatus) -> Option<NixPid> {
    match status {
        WaitStatus::Exited(pid, _) => Some(*pid),
        WaitStatus::Signaled(pid, _, _) => Some(*pid),
        WaitStatus::Stopped(pid, _) => Some(*pid),
        WaitStatus::Continued(pid) => Some(*pid),
        _ => None,
    }
}

/// List basedir's subdirectories as queue candidates, flagging whether each
/// currently holds at least one regular, non-dotfile entry (spec §4.4).
fn list_queue_infos(basedir: &Path) -> Vec<QueueInfo> {
    let mut infos = match std::fs::read_dir(basedir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                let non_empty = queue_dir_non_empty(&e.path());
                QueueInfo { name, non_empty }
            })
            .collect::<Vec<_>>(),
        Err(_) => Vec::new(),
    };
    infos.sort_by(|a, b| a.name.cmp(&b.name));
    infos
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;

fn queue_dir_non_empty(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| {
            entries.any(|e| match e {
                Ok(entry) => {
                    let name = entry.file_name();
                    let name = name.to_string_lossy();
                    !name.starts_with('.') && entry.file_type().map(|t| t.is_file()).unwrap_or(false)
                }
                Err(_) => false,
            })
        })
        .unwrap_or(false)
}
