// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::fs::{symlink, PermissionsExt};

use closure_core::NodeKind;
use tempfile::tempdir;

use super::*;

#[test]
fn traversal_discovers_a_plain_directory_tree() {
    let root = tempdir().unwrap();
    std::fs::create_dir(root.path().join("sub")).unwrap();
    std::fs::write(root.path().join("sub").join("leaf.txt"), b"hello\n").unwrap();

    let mut table = NodeTable::new();
    table.append_path(root.path());
    run_traversal(&mut table, None, false).unwrap();

    let sources: Vec<_> = table.nodes().iter().map(|n| n.source.clone()).collect();
    assert!(sources.contains(&root.path().join("sub")));
    assert!(sources.contains(&root.path().join("sub").join("leaf.txt")));
    assert!(table.nodes().iter().all(|n| n.processed));
}

#[test]
fn traversal_follows_a_shebang_to_its_interpreter() {
    let root = tempdir().unwrap();
    let script = root.path().join("run.sh");
    std::fs::write(&script, b"#!/bin/sh\necho hi\n").unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();

    let mut table = NodeTable::new();
    table.append_path(&script);
    run_traversal(&mut table, None, false).unwrap();

    assert!(table.nodes().iter().any(|n| n.source == std::path::Path::new("/bin/sh")));
}

#[test]
fn traversal_canonicalizes_a_relative_symlink_target() {
    let root = tempdir().unwrap();
    std::fs::write(root.path().join("real"), b"x").unwrap();
    let link = root.path().join("alias");
    symlink("real", &link).unwrap();

    let mut table = NodeTable::new();
    table.append_path(&link);
    run_traversal(&mut table, None, false).unwrap();

    let link_node = table.nodes().iter().find(|n| n.source == link).unwrap();
    assert_eq!(link_node.kind, Some(NodeKind::Symlink));
    assert_eq!(link_node.symlink_target.as_deref(), Some("real"));
    assert!(table.nodes().iter().any(|n| n.source == root.path().join("real")));
}
