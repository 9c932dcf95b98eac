// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::os::unix::fs::PermissionsExt;
use tempfile::tempdir;

fn write_executable(dir: &Path, name: &str, contents: &[u8]) {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
}

fn write_plain(dir: &Path, name: &str, contents: &[u8]) {
    std::fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn classifies_shebang_executable_as_shell() {
    let dir = tempdir().unwrap();
    write_executable(dir.path(), "10-handler", b"#!/bin/sh\necho hi\n");

    let set = RuleSet::scan(dir.path(), None).unwrap();
    assert_eq!(set.rules().len(), 1);
    assert!(matches!(set.rules()[0].kind, RuleKind::Shell));
}

#[test]
fn shebang_without_exec_bit_is_discarded() {
    let dir = tempdir().unwrap();
    write_plain(dir.path(), "10-handler", b"#!/bin/sh\necho hi\n");

    let set = RuleSet::scan(dir.path(), None).unwrap();
    assert!(set.rules().is_empty());
}

#[test]
fn non_shebang_without_loader_is_discarded() {
    let dir = tempdir().unwrap();
    write_executable(dir.path(), "10-handler", b"not a script at all");

    let set = RuleSet::scan(dir.path(), None).unwrap();
    assert!(set.rules().is_empty());
}

#[test]
fn dotfiles_and_backup_suffixes_are_excluded() {
    let dir = tempdir().unwrap();
    write_executable(dir.path(), ".hidden", b"#!/bin/sh\n");
    write_executable(dir.path(), "rule~", b"#!/bin/sh\n");
    write_executable(dir.path(), "rule.swp", b"#!/bin/sh\n");
    write_executable(dir.path(), "rule.rpmnew", b"#!/bin/sh\n");
    write_executable(dir.path(), "rule.rpmsave", b"#!/bin/sh\n");
    write_executable(dir.path(), "rule.#", b"#!/bin/sh\n");
    write_executable(dir.path(), "10-good", b"#!/bin/sh\n");

    let set = RuleSet::scan(dir.path(), None).unwrap();
    assert_eq!(set.rules().len(), 1);
    assert_eq!(set.rules()[0].path.file_name().unwrap(), "10-good");
}

#[test]
fn order_is_descending_by_filename() {
    let dir = tempdir().unwrap();
    write_executable(dir.path(), "10-a", b"#!/bin/sh\n");
    write_executable(dir.path(), "20-b", b"#!/bin/sh\n");
    write_executable(dir.path(), "05-c", b"#!/bin/sh\n");

    let set = RuleSet::scan(dir.path(), None).unwrap();
    let names: Vec<_> = set
        .rules()
        .iter()
        .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["20-b", "10-a", "05-c"]);
}

struct FakeScript;
impl ScriptHandler for FakeScript {
    fn run(&self) {}
    fn run_post(&self) {}
}

fn fake_loader(_path: &Path) -> Option<Box<dyn ScriptHandler>> {
    Some(Box::new(FakeScript))
}

#[test]
fn non_shebang_with_loader_becomes_script_rule() {
    let dir = tempdir().unwrap();
    write_executable(dir.path(), "10-lua", b"-- a script\n");

    let set = RuleSet::scan(dir.path(), Some(fake_loader as ScriptLoader)).unwrap();
    assert_eq!(set.rules().len(), 1);
    assert!(matches!(set.rules()[0].kind, RuleKind::Script));
}
