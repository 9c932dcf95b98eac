// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tempfile::tempdir;
use uevent_core::rule::{Rule, RuleKind, ScriptHandler};

use super::*;

#[test]
fn event_base_vars_sets_process_event_and_queue() {
    let env = event_base_vars("q1");
    assert!(env.iter().any(|(k, v)| k == "PROCESS" && v == "EVENT"));
    assert!(env.iter().any(|(k, v)| k == "QUEUE" && v == "q1"));
}

#[test]
fn event_post_vars_has_no_eventname() {
    let env = event_post_vars("q1");
    assert!(env.iter().any(|(k, v)| k == "PROCESS" && v == "POST"));
    assert!(env.iter().all(|(k, _)| k != "EVENTNAME"));
}

#[test]
fn list_regular_files_skips_dirty_marker_and_subdirs() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("e1"), b"x").unwrap();
    std::fs::write(dir.path().join(".dirty"), b"").unwrap();
    std::fs::create_dir(dir.path().join("subdir")).unwrap();

    let names = list_regular_files(dir.path()).unwrap();
    assert_eq!(names, vec!["e1".to_string()]);
}

#[test]
fn dirty_marker_present_detects_rehash_hook() {
    let dir = tempdir().unwrap();
    assert!(!dirty_marker_present(dir.path()));
    std::fs::write(dir.path().join(".dirty"), b"").unwrap();
    assert!(dirty_marker_present(dir.path()));
}

struct RecordingScript {
    run_count: Arc<AtomicU32>,
    post_count: Arc<AtomicU32>,
}

impl ScriptHandler for RecordingScript {
    fn run(&self) {
        self.run_count.fetch_add(1, Ordering::SeqCst);
    }
    fn run_post(&self) {
        self.post_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn invoke_rule_dispatches_script_phase_correctly() {
    let run_count = Arc::new(AtomicU32::new(0));
    let post_count = Arc::new(AtomicU32::new(0));
    let rule = Rule {
        path: PathBuf::from("10-fake"),
        kind: RuleKind::Script,
        script: Some(Box::new(RecordingScript {
            run_count: run_count.clone(),
            post_count: post_count.clone(),
        })),
    };

    invoke_rule(&rule, &[], HandlerPhase::Event);
    assert_eq!(run_count.load(Ordering::SeqCst), 1);
    assert_eq!(post_count.load(Ordering::SeqCst), 0);

    invoke_rule(&rule, &[], HandlerPhase::Post);
    assert_eq!(run_count.load(Ordering::SeqCst), 1);
    assert_eq!(post_count.load(Ordering::SeqCst), 1);
}
