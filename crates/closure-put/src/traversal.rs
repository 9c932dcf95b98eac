// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traversal engine (spec §4.11): drains the node table's work set, walking
//! each unprocessed seed's subtree with a physical (non-symlink-following)
//! directory walk, classifying regular files and chasing the paths they
//! reference.

use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use closure_core::{classify_regular_file, elf_has_dynamic_section, parse_ldd_output, Classification, NodeMetadata, NodeTable};
use thiserror::Error;

/// glibc's `LINE_MAX` (`limits.h`); the classifier only ever needs this
/// many leading bytes of a regular file (spec §4.10).
const LINE_MAX: usize = 2048;

#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("read {0}: {1}")]
    Read(PathBuf, #[source] io::Error),
    #[error("readlink {0}: {1}")]
    ReadLink(PathBuf, #[source] io::Error),
    #[error("run ldd on {0}: {1}")]
    Ldd(PathBuf, #[source] io::Error),
}

pub fn run_traversal(table: &mut NodeTable, strip_prefix: Option<&Path>, verbose: bool) -> Result<(), TraversalError> {
    loop {
        let Some(idx) = table.unprocessed_indices().into_iter().next() else { break };
        let source = table.get(idx).source.clone();
        if verbose {
            tracing::info!(path = %source.display(), "processing");
        }
        walk_one(table, &source, strip_prefix)?;
    }
    Ok(())
}

fn walk_one(table: &mut NodeTable, root: &Path, strip_prefix: Option<&Path>) -> Result<(), TraversalError> {
    let mut stack = vec![root.to_path_buf()];

    while let Some(path) = stack.pop() {
        let idx = table.append_path(&path);

        if table.get(idx).processed {
            continue;
        }

        let meta = fs::symlink_metadata(&path).map_err(|e| TraversalError::Read(path.clone(), e))?;
        let file_type = meta.file_type();

        let symlink_target = if file_type.is_symlink() {
            Some(
                fs::read_link(&path)
                    .map_err(|e| TraversalError::ReadLink(path.clone(), e))?
                    .to_string_lossy()
                    .into_owned(),
            )
        } else {
            None
        };

        table.record_metadata(
            idx,
            NodeMetadata {
                mode: meta.mode(),
                size: meta.size(),
                uid: meta.uid(),
                gid: meta.gid(),
                rdev: meta.rdev(),
                symlink_target: symlink_target.clone(),
            },
        );
        table.mark_processed(idx);

        if file_type.is_dir() {
            let mut children: Vec<PathBuf> = fs::read_dir(&path)
                .map_err(|e| TraversalError::Read(path.clone(), e))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .collect();
            children.sort();
            stack.extend(children);
            continue;
        }

        if file_type.is_file() {
            process_regular_file(table, &path, strip_prefix)?;
            continue;
        }

        if file_type.is_symlink() {
            if let Some(target) = &symlink_target {
                let canonical = closure_core::canonicalize_symlink(&path, target);
                table
                    .append_fullpath(&canonical, strip_prefix, lstat_probe)
                    .map_err(|e| TraversalError::Read(canonical.clone(), io::Error::other(e.to_string())))?;
            }
        }

        // Block/char/fifo/socket: metadata already recorded above, nothing
        // further to chase.
    }

    Ok(())
}

fn process_regular_file(table: &mut NodeTable, path: &Path, strip_prefix: Option<&Path>) -> Result<(), TraversalError> {
    let contents = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if matches!(e.kind(), io::ErrorKind::PermissionDenied) => return Ok(()),
        Err(e) => return Err(TraversalError::Read(path.to_path_buf(), e)),
    };
    let head_len = contents.len().min(LINE_MAX);

    match classify_regular_file(&contents[..head_len]) {
        Classification::Interpreter(interp) => {
            let interp_path = PathBuf::from(interp);
            table
                .append_fullpath(&interp_path, strip_prefix, lstat_probe)
                .map_err(|e| TraversalError::Read(interp_path, io::Error::other(e.to_string())))?;
        }
        Classification::Elf if elf_has_dynamic_section(&contents) => {
            for dep in shared_object_dependencies(path)? {
                table
                    .append_fullpath(&dep, strip_prefix, lstat_probe)
                    .map_err(|e| TraversalError::Read(dep.clone(), io::Error::other(e.to_string())))?;
            }
        }
        Classification::Elf | Classification::Inert => {}
    }

    Ok(())
}

/// Invoke the system dynamic linker's dependency resolution and parse its
/// output (spec §4.10). Stderr is folded into stdout, matching the
/// original's `ldd %s 2>&1` invocation.
fn shared_object_dependencies(path: &Path) -> Result<Vec<PathBuf>, TraversalError> {
    let output = Command::new("ldd")
        .arg(path)
        .output()
        .map_err(|e| TraversalError::Ldd(path.to_path_buf(), e))?;
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(parse_ldd_output(&combined))
}

pub fn lstat_probe(path: &Path) -> io::Result<NodeMetadata> {
    let meta = fs::symlink_metadata(path)?;
    let symlink_target = if meta.file_type().is_symlink() {
        Some(fs::read_link(path)?.to_string_lossy().into_owned())
    } else {
        None
    };
    Ok(NodeMetadata {
        mode: meta.mode(),
        size: meta.size(),
        uid: meta.uid(),
        gid: meta.gid(),
        rdev: meta.rdev(),
        symlink_target,
    })
}

#[cfg(test)]
#[path = "traversal_tests.rs"]
mod tests;
