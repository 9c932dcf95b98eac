// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn os(s: &str) -> OsString {
    OsString::from(s)
}

#[test]
fn overlays_new_keys_onto_base() {
    let base = vec![(os("PATH"), os("/bin"))];
    let bindings = vec![("FOO".to_string(), b"bar".to_vec())];
    let env = apply_bindings(&base, &bindings);
    assert_eq!(env, vec![(os("PATH"), os("/bin")), (os("FOO"), os("bar"))]);
}

#[test]
fn later_binding_overwrites_existing_key() {
    let base = vec![(os("EVENTNAME"), os("stale"))];
    let bindings = vec![("EVENTNAME".to_string(), b"fresh".to_vec())];
    let env = apply_bindings(&base, &bindings);
    assert_eq!(env, vec![(os("EVENTNAME"), os("fresh"))]);
}

#[test]
fn isolates_one_event_slot_from_another() {
    let base = vec![(os("PROCESS"), os("EVENT"))];
    let first = apply_bindings(&base, &[("FOO".to_string(), b"1".to_vec())]);
    let second = apply_bindings(&base, &[("BAR".to_string(), b"2".to_vec())]);
    assert!(first.iter().all(|(k, _)| k != "BAR"));
    assert!(second.iter().all(|(k, _)| k != "FOO"));
}

#[test]
fn worker_base_vars_sets_process_and_queue() {
    let vars = worker_base_vars("q1");
    assert_eq!(vars, vec![(os("PROCESS"), os("EVENT")), (os("QUEUE"), os("q1"))]);
}

#[test]
fn worker_post_vars_has_no_eventname_but_keeps_queue() {
    let vars = worker_post_vars("q1");
    assert!(vars.iter().all(|(k, _)| k != "EVENTNAME"));
    assert_eq!(vars, vec![(os("PROCESS"), os("POST")), (os("QUEUE"), os("q1"))]);
}
