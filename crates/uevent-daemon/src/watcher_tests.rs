// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tempfile::tempdir;

use super::*;

#[test]
fn drain_does_not_error_with_no_pending_events() {
    let dir = tempdir().unwrap();
    let watcher = DirWatcher::new(dir.path(), basedir_mask()).unwrap();
    watcher.drain().unwrap();
}

#[test]
fn detects_file_creation_in_watched_directory() {
    let dir = tempdir().unwrap();
    let watcher = DirWatcher::new(dir.path(), basedir_mask()).unwrap();

    std::fs::create_dir(dir.path().join("q1")).unwrap();

    // basedir_mask watches CREATE; a single drain should succeed without
    // erroring regardless of how many records the kernel coalesced.
    watcher.drain().unwrap();
}

#[test]
fn masks_are_distinct_per_directory_kind() {
    assert_ne!(basedir_mask(), rulesdir_mask());
    assert_ne!(rulesdir_mask(), queue_mask());
    assert!(rulesdir_mask().contains(AddWatchFlags::IN_CLOSE_WRITE));
    assert!(queue_mask().contains(AddWatchFlags::IN_CLOSE_WRITE));
    assert!(!basedir_mask().contains(AddWatchFlags::IN_CLOSE_WRITE));
}
