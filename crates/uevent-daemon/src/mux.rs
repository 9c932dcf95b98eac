// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FD multiplexer: thin epoll wrapper (spec §4.1).
//!
//! Registration takes ownership of the fd so `remove` closing it is just
//! dropping the owner — there is no separate "close" step to forget.

use std::collections::HashMap;
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MuxError {
    #[error("epoll_create: {0}")]
    Create(#[source] Errno),
    #[error("epoll_ctl add: {0}")]
    Add(#[source] Errno),
    #[error("epoll_ctl del: {0}")]
    Remove(#[source] Errno),
    #[error("epoll_wait: {0}")]
    Wait(#[source] Errno),
}

/// Readiness multiplexer. `None` in `epoll` is the sentinel "closed" state
/// from spec §4.1: once closed, `wait` returns immediately with no events
/// and the supervisor treats that as "exit the loop".
pub struct Mux {
    epoll: Option<Epoll>,
    owned: HashMap<RawFd, OwnedFd>,
}

impl Mux {
    pub fn new() -> Result<Self, MuxError> {
        let epoll = Epoll::new(EpollCreateFlags::empty()).map_err(MuxError::Create)?;
        Ok(Self {
            epoll: Some(epoll),
            owned: HashMap::new(),
        })
    }

    /// Register `fd` for `interest`, taking ownership. Returns the raw fd
    /// value so the caller can use it as a lookup key in `wait`'s results.
    pub fn add(&mut self, fd: OwnedFd, interest: EpollFlags) -> Result<RawFd, MuxError> {
        let raw = fd.as_raw_fd();
        if let Some(epoll) = &self.epoll {
            epoll
                .add(&fd, EpollEvent::new(interest, raw as u64))
                .map_err(MuxError::Add)?;
        }
        self.owned.insert(raw, fd);
        Ok(raw)
    }

    /// Unregister and close `fd` (spec §4.1: "remove closes the fd").
    pub fn remove(&mut self, fd: RawFd) -> Result<(), MuxError> {
        if let Some(owned) = self.owned.remove(&fd) {
            if let Some(epoll) = &self.epoll {
                // The fd may already be invalid if the child it belonged to
                // is long gone; epoll drops stale entries on its own, so a
                // failed delete here isn't fatal.
                let _ = epoll.delete(owned.as_fd());
            }
        }
        Ok(())
    }

    /// Wait up to `timeout_ms` for readiness on any registered fd, returning
    /// at most `capacity` ready (fd, events) pairs. A signal interruption is
    /// reported as an empty result, not an error (spec §4.1).
    pub fn wait(&self, timeout_ms: i32, capacity: usize) -> Result<Vec<(RawFd, EpollFlags)>, MuxError> {
        let Some(epoll) = &self.epoll else {
            return Ok(Vec::new());
        };

        let mut buf = vec![EpollEvent::new(EpollFlags::empty(), 0); capacity];
        match epoll.wait(&mut buf, EpollTimeout::from(timeout_ms)) {
            Ok(n) => Ok(buf[..n]
                .iter()
                .map(|ev| (ev.data() as RawFd, ev.events()))
                .collect()),
            Err(Errno::EINTR) => Ok(Vec::new()),
            Err(e) => Err(MuxError::Wait(e)),
        }
    }

    /// Transition to the closed sentinel state, dropping (and thus closing)
    /// every registered fd.
    pub fn close(&mut self) {
        self.owned.clear();
        self.epoll = None;
    }

    pub fn is_closed(&self) -> bool {
        self.epoll.is_none()
    }
}

#[cfg(test)]
#[path = "mux_tests.rs"]
mod tests;
