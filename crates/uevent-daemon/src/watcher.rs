// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory watcher: one inotify instance per watched directory (spec §4.3).

use std::os::fd::{AsFd, OwnedFd};
use std::path::Path;

use nix::errno::Errno;
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("inotify_init: {0}")]
    Init(#[source] Errno),
    #[error("inotify_add_watch {0}: {1}")]
    AddWatch(std::path::PathBuf, #[source] Errno),
    #[error("read inotify events: {0}")]
    Read(#[source] Errno),
}

/// Interest mask for the base directory: detect queue add/remove.
pub fn basedir_mask() -> AddWatchFlags {
    AddWatchFlags::IN_CREATE | AddWatchFlags::IN_DELETE | AddWatchFlags::IN_DONT_FOLLOW
}

/// Interest mask for the rules directory: detect edit-and-save of rule
/// files as well as add/remove.
pub fn rulesdir_mask() -> AddWatchFlags {
    AddWatchFlags::IN_ATTRIB
        | AddWatchFlags::IN_CREATE
        | AddWatchFlags::IN_DELETE
        | AddWatchFlags::IN_MOVED_TO
        | AddWatchFlags::IN_CLOSE_WRITE
        | AddWatchFlags::IN_DONT_FOLLOW
}

/// Interest mask for a queue directory: detect new event files.
pub fn queue_mask() -> AddWatchFlags {
    AddWatchFlags::IN_MOVED_TO | AddWatchFlags::IN_CLOSE_WRITE | AddWatchFlags::IN_DONT_FOLLOW
}

pub struct DirWatcher {
    inotify: Inotify,
}

impl DirWatcher {
    pub fn new(path: &Path, mask: AddWatchFlags) -> Result<Self, WatcherError> {
        let inotify = Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC).map_err(WatcherError::Init)?;
        inotify
            .add_watch(path, mask)
            .map_err(|e| WatcherError::AddWatch(path.to_path_buf(), e))?;
        Ok(Self { inotify })
    }

    /// A duplicate fd for registering with [`crate::mux::Mux`]; see
    /// [`crate::signals::SignalSource::dup_for_mux`] for why this is a dup
    /// rather than a move.
    pub fn dup_for_mux(&self) -> Result<OwnedFd, WatcherError> {
        nix::unistd::dup(self.inotify.as_fd()).map_err(WatcherError::Init)
    }

    /// Drain every pending notification. Contents are irrelevant (spec
    /// §4.3): any readiness means "rescan and reconcile".
    pub fn drain(&self) -> Result<(), WatcherError> {
        loop {
            match self.inotify.read_events() {
                Ok(events) if events.is_empty() => break,
                Ok(_) => continue,
                Err(Errno::EAGAIN) => break,
                Err(e) => return Err(WatcherError::Read(e)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
