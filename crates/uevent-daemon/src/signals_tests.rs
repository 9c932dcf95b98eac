// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use nix::sys::signal::{raise, Signal};

use super::*;

#[test]
fn classify_maps_routed_signals() {
    assert_eq!(classify(Signal::SIGINT as i32), Some(SignalEvent::Interrupt));
    assert_eq!(classify(Signal::SIGTERM as i32), Some(SignalEvent::Terminate));
    assert_eq!(classify(Signal::SIGCHLD as i32), Some(SignalEvent::ChildExited));
    assert_eq!(classify(Signal::SIGHUP as i32), Some(SignalEvent::Hangup));
    assert_eq!(classify(Signal::SIGUSR1 as i32), None);
}

#[test]
fn drain_observes_a_raised_signal() {
    // SignalSource::new() would block SIGABRT/SIGSEGV process-wide, which
    // would affect every other test in this binary; exercise the fd
    // directly against a narrower mask instead.
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGUSR2);
    signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&mask), None).unwrap();
    let mut fd = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK).unwrap();

    raise(Signal::SIGUSR2).unwrap();

    let mut saw_it = false;
    loop {
        match fd.read_signal() {
            Ok(Some(info)) => {
                if info.ssi_signo as i32 == Signal::SIGUSR2 as i32 {
                    saw_it = true;
                }
            }
            Ok(None) => break,
            Err(Errno::EAGAIN) => break,
            Err(e) => panic!("read_signal: {e}"),
        }
    }
    assert!(saw_it);
}
