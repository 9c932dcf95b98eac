// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tempfile::tempdir;

use super::*;

#[test]
fn validate_directories_accepts_two_real_directories() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    assert!(validate_directories(a.path(), b.path()).is_ok());
}

#[test]
fn validate_directories_rejects_missing_basedir() {
    let b = tempdir().unwrap();
    let missing = b.path().join("does-not-exist");
    let err = validate_directories(&missing, b.path()).unwrap_err();
    assert!(matches!(err, SupervisorError::NotADirectory(p) if p == missing));
}

#[test]
fn validate_directories_rejects_file_in_place_of_rulesdir() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let file_path = b.path().join("not-a-dir");
    std::fs::write(&file_path, b"x").unwrap();
    let err = validate_directories(a.path(), &file_path).unwrap_err();
    assert!(matches!(err, SupervisorError::NotADirectory(p) if p == file_path));
}

#[test]
fn list_queue_infos_flags_non_empty_queues() {
    let base = tempdir().unwrap();
    std::fs::create_dir(base.path().join("empty")).unwrap();
    std::fs::create_dir(base.path().join("full")).unwrap();
    std::fs::write(base.path().join("full").join("e1"), b"x").unwrap();
    std::fs::write(base.path().join("full").join(".hidden"), b"x").unwrap();

    let infos = list_queue_infos(base.path());
    assert_eq!(infos.len(), 2);
    let full = infos.iter().find(|i| i.name == "full").unwrap();
    let empty = infos.iter().find(|i| i.name == "empty").unwrap();
    assert!(full.non_empty);
    assert!(!empty.non_empty);
}
