// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal source: signalfd wrapper (spec §4.2).

use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::sys::signal::{self, SigSet, Signal, SigmaskHow};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("sigprocmask: {0}")]
    ProcMask(#[source] Errno),
    #[error("signalfd: {0}")]
    Create(#[source] Errno),
    #[error("read signalfd: {0}")]
    Read(#[source] Errno),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Interrupt,
    Terminate,
    ChildExited,
    Hangup,
}

/// Signals routed through the fd (spec §6): INT, TERM, CHLD, HUP. ABRT and
/// SEGV are left out of the *blocked* mask entirely so fault signals still
/// get their default disposition.
fn routed_mask() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTERM);
    set.add(Signal::SIGCHLD);
    set.add(Signal::SIGHUP);
    set
}

/// Block every signal except SIGABRT/SIGSEGV process-wide (spec §4.2), then
/// create an fd that surfaces the routed subset as readable records.
pub struct SignalSource {
    fd: SignalFd,
}

impl SignalSource {
    pub fn new() -> Result<Self, SignalError> {
        let mut blocked = SigSet::all();
        blocked.remove(Signal::SIGABRT);
        blocked.remove(Signal::SIGSEGV);
        signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&blocked), None).map_err(SignalError::ProcMask)?;

        let fd = SignalFd::with_flags(&routed_mask(), SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
            .map_err(SignalError::Create)?;

        Ok(Self { fd })
    }

    /// A duplicate fd suitable for registering with [`crate::mux::Mux`].
    /// Both descriptors refer to the same underlying signalfd object, so
    /// the multiplexer can own (and later close) its copy independently of
    /// the one this struct uses for `read_signal`.
    pub fn dup_for_mux(&self) -> Result<OwnedFd, SignalError> {
        nix::unistd::dup(self.fd.as_fd()).map_err(SignalError::Create)
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Drain every pending signal record, translating the ones we act on
    /// and silently discarding anything else (spec §4.2: "observed, no
    /// action required" for HUP, and nothing at all for the rest).
    pub fn drain(&mut self) -> Result<Vec<SignalEvent>, SignalError> {
        let mut events = Vec::new();
        loop {
            match self.fd.read_signal() {
                Ok(Some(info)) => {
                    if let Some(event) = classify(info.ssi_signo as i32) {
                        events.push(event);
                    }
                }
                Ok(None) => break,
                Err(Errno::EAGAIN) => break,
                Err(e) => return Err(SignalError::Read(e)),
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;

fn classify(signo: i32) -> Option<SignalEvent> {
    if signo == Signal::SIGINT as i32 {
        Some(SignalEvent::Interrupt)
    } else if signo == Signal::SIGTERM as i32 {
        Some(SignalEvent::Terminate)
    } else if signo == Signal::SIGCHLD as i32 {
        Some(SignalEvent::ChildExited)
    } else if signo == Signal::SIGHUP as i32 {
        Some(SignalEvent::Hangup)
    } else {
        None
    }
}
