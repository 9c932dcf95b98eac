// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure helpers for building a worker's per-event environment.
//!
//! The actual fork/exec and environment-pointer juggling live in
//! `uevent-daemon::worker`; this module only knows how to overlay parsed
//! event bindings onto a base environment snapshot, so the merge logic is
//! unit-testable without a child process.

use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;

use crate::event::Binding;

/// Overlay `bindings` onto `base`, overwriting any key already present and
/// preserving `base`'s order for untouched keys (later-inserted bindings from
/// the event file win on duplicate keys, matching `setenv(name, value, 1)`).
pub fn apply_bindings(base: &[(OsString, OsString)], bindings: &[Binding]) -> Vec<(OsString, OsString)> {
    let mut env: Vec<(OsString, OsString)> = base.to_vec();

    for (name, value) in bindings {
        let key = OsString::from(name);
        let val = OsString::from(std::ffi::OsStr::from_bytes(value));
        match env.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = val,
            None => env.push((key, val)),
        }
    }

    env
}

/// Variables exported for every worker at fork time, before any event is
/// applied (spec §4.7 step 3).
pub fn worker_base_vars(queue_name: &str) -> Vec<(OsString, OsString)> {
    vec![
        (OsString::from("PROCESS"), OsString::from("EVENT")),
        (OsString::from("QUEUE"), OsString::from(queue_name)),
    ]
}

/// Variables exported for the POST phase (spec §4.7 step 6): `QUEUE` stays
/// set, `PROCESS` becomes `POST`, and there is no `EVENTNAME`.
pub fn worker_post_vars(queue_name: &str) -> Vec<(OsString, OsString)> {
    vec![
        (OsString::from("PROCESS"), OsString::from("POST")),
        (OsString::from("QUEUE"), OsString::from(queue_name)),
    ]
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
