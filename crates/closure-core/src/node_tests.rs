// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use super::*;

fn dir_meta() -> NodeMetadata {
    NodeMetadata {
        mode: S_IFDIR | 0o755,
        size: 0,
        uid: 0,
        gid: 0,
        rdev: 0,
        symlink_target: None,
    }
}

#[test]
fn append_path_dedups_by_exact_source() {
    let mut table = NodeTable::new();
    let a = table.append_path(Path::new("/usr/bin/ls"));
    let b = table.append_path(Path::new("/usr/bin/ls"));
    assert_eq!(a, b);
    assert_eq!(table.len(), 1);
}

#[test]
fn from_mode_classifies_every_known_type() {
    assert_eq!(NodeKind::from_mode(S_IFDIR), Some(NodeKind::Directory));
    assert_eq!(NodeKind::from_mode(S_IFREG), Some(NodeKind::Regular));
    assert_eq!(NodeKind::from_mode(S_IFLNK), Some(NodeKind::Symlink));
    assert_eq!(NodeKind::from_mode(S_IFBLK), Some(NodeKind::Block));
    assert_eq!(NodeKind::from_mode(S_IFCHR), Some(NodeKind::Char));
    assert_eq!(NodeKind::from_mode(S_IFIFO), Some(NodeKind::Fifo));
    assert_eq!(NodeKind::from_mode(S_IFSOCK), Some(NodeKind::Socket));
}

#[test]
fn append_fullpath_creates_every_ancestor_up_to_root() {
    let mut table = NodeTable::new();
    let idx = table
        .append_fullpath(Path::new("/usr/bin/ls"), None, |_| Ok(dir_meta()))
        .unwrap();

    assert_eq!(table.get(idx).source, Path::new("/usr/bin/ls"));
    let sources: Vec<_> = table.nodes().iter().map(|n| n.source.clone()).collect();
    assert!(sources.contains(&std::path::PathBuf::from("/")));
    assert!(sources.contains(&std::path::PathBuf::from("/usr")));
    assert!(sources.contains(&std::path::PathBuf::from("/usr/bin")));
    assert!(sources.contains(&std::path::PathBuf::from("/usr/bin/ls")));

    for ancestor in ["/", "/usr", "/usr/bin"] {
        let i = table.append_path(Path::new(ancestor));
        assert!(table.get(i).processed, "{ancestor} should be marked processed");
    }
    assert!(!table.get(idx).processed, "the leaf itself is not marked by append_fullpath");
}

#[test]
fn append_fullpath_stops_climbing_at_strip_prefix() {
    let mut table = NodeTable::new();
    table
        .append_fullpath(Path::new("/usr/local/bin/tool"), Some(Path::new("/usr/local")), |_| Ok(dir_meta()))
        .unwrap();

    let sources: Vec<_> = table.nodes().iter().map(|n| n.source.clone()).collect();
    assert!(sources.contains(&std::path::PathBuf::from("/usr/local/bin")));
    assert!(!sources.contains(&std::path::PathBuf::from("/usr/local")));
    assert!(!sources.contains(&std::path::PathBuf::from("/usr")));
    assert!(!sources.contains(&std::path::PathBuf::from("/")));
}

#[test]
fn append_fullpath_does_not_restat_an_already_processed_ancestor() {
    let mut table = NodeTable::new();
    let mut calls = 0;
    table
        .append_fullpath(Path::new("/usr/bin/ls"), None, |_| {
            calls += 1;
            Ok(dir_meta())
        })
        .unwrap();
    let first_call_count = calls;

    table
        .append_fullpath(Path::new("/usr/bin/cat"), None, |_| {
            calls += 1;
            Ok(dir_meta())
        })
        .unwrap();

    // Only the new leaf's own ancestors that weren't already processed
    // directories get stat'd again; here that's none (/, /usr, /usr/bin
    // are all already processed directories), so the call count doesn't
    // grow.
    assert_eq!(calls, first_call_count);
}

#[test]
fn unprocessed_indices_excludes_marked_nodes() {
    let mut table = NodeTable::new();
    let idx = table.append_path(Path::new("/a"));
    assert_eq!(table.unprocessed_indices(), vec![idx]);
    table.mark_processed(idx);
    assert!(table.unprocessed_indices().is_empty());
}
