// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installer (spec §4.12): realises the node table at a destination
//! directory, or, in dry-run mode, reports what would have been realised.

use std::fs;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use closure_core::{FileNode, NodeKind, NodeTable};
use nix::errno::Errno;
use nix::sys::stat::{mknod, Mode, SFlag};
use nix::unistd::{fchownat, mkfifo, AccessFlags, AtFlags, Gid, Uid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("mkdir {0}: {1}")]
    Mkdir(PathBuf, #[source] std::io::Error),
    #[error("mknod {0}: {1}")]
    Mknod(PathBuf, #[source] Errno),
    #[error("symlink {0}: {1}")]
    Symlink(PathBuf, #[source] std::io::Error),
    #[error("mkfifo {0}: {1}")]
    Mkfifo(PathBuf, #[source] Errno),
    #[error("bind socket {0}: {1}")]
    Socket(PathBuf, #[source] std::io::Error),
    #[error("remove {0}: {1}")]
    Remove(PathBuf, #[source] std::io::Error),
    #[error("create {0}: {1}")]
    Create(PathBuf, #[source] std::io::Error),
    #[error("open {0}: {1}")]
    OpenSource(PathBuf, #[source] std::io::Error),
    #[error("copy {0} -> {1}: {2}")]
    Copy(PathBuf, PathBuf, #[source] Errno),
    #[error("chown {0}: {1}")]
    Chown(PathBuf, #[source] Errno),
    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),
}

pub struct InstallOptions<'a> {
    pub destdir: &'a Path,
    pub prefix: Option<&'a Path>,
    pub force: bool,
    pub verbose: bool,
}

/// Destination path for `node`, or `None` if the node equals the strip
/// prefix exactly and should be skipped entirely (spec §3, §4.12).
pub fn destination_for(source: &Path, destdir: &Path, prefix: Option<&Path>) -> Option<PathBuf> {
    if let Some(prefix) = prefix {
        if source == prefix {
            return None;
        }
        let source_str = source.to_string_lossy();
        let prefix_str = prefix.to_string_lossy();
        if source_str.len() != prefix_str.len()
            && source_str.starts_with(prefix_str.as_ref())
            && source_str.as_bytes().get(prefix_str.len()) == Some(&b'/')
        {
            return Some(join_destdir(destdir, &source_str[prefix_str.len()..]));
        }
    }
    Some(join_destdir(destdir, &source.to_string_lossy()))
}

fn join_destdir(destdir: &Path, suffix: &str) -> PathBuf {
    let mut path = destdir.to_path_buf();
    path.push(suffix.trim_start_matches('/'));
    path
}

/// Order nodes so every directory precedes every non-directory, and within
/// each class by source path ascending (spec §4.12).
pub fn sorted_nodes(table: &NodeTable) -> Vec<&FileNode> {
    let mut nodes: Vec<&FileNode> = table.nodes().iter().collect();
    nodes.sort_by(|a, b| {
        let rank = |n: &FileNode| if n.kind == Some(NodeKind::Directory) { 0 } else { 1 };
        rank(a).cmp(&rank(b)).then_with(|| a.source.cmp(&b.source))
    });
    nodes
}

/// One dry-run log line, spec §4.12 format: `T\t<source>\t<dest>\t<target>`.
pub fn log_line(node: &FileNode, dest: &Path) -> String {
    let tag = node.kind.map(|k| k.tag()).unwrap_or('?');
    format!(
        "{}\t{}\t{}\t{}",
        tag,
        node.source.display(),
        dest.display(),
        node.symlink_target.as_deref().unwrap_or("")
    )
}

/// Dry-run report: no filesystem mutation, one line per realised node.
pub fn dry_run_report(table: &NodeTable, opts: &InstallOptions) -> Vec<String> {
    sorted_nodes(table)
        .into_iter()
        .filter_map(|node| {
            let dest = destination_for(&node.source, opts.destdir, opts.prefix)?;
            Some(log_line(node, &dest))
        })
        .collect()
}

/// Realise every node at the destination, returning the same log lines a
/// dry run would have produced (spec §4.12: used for the optional post-run
/// log).
pub fn install(table: &NodeTable, opts: &InstallOptions) -> Result<Vec<String>, InstallError> {
    let mut lines = Vec::new();
    for node in sorted_nodes(table) {
        let Some(dest) = destination_for(&node.source, opts.destdir, opts.prefix) else {
            continue;
        };
        install_one(node, &dest, opts)?;
        lines.push(log_line(node, &dest));
    }
    Ok(lines)
}

fn install_one(node: &FileNode, dest: &Path, opts: &InstallOptions) -> Result<(), InstallError> {
    let mode = Mode::from_bits_truncate(node.mode & 0o7777);

    match node.kind {
        Some(NodeKind::Directory) => {
            match fs::create_dir(dest) {
                Ok(()) => {
                    if opts.verbose {
                        tracing::info!(path = %dest.display(), "install (directory)");
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if opts.verbose {
                        tracing::info!(path = %dest.display(), "skip (directory)");
                    }
                }
                Err(e) => return Err(InstallError::Mkdir(dest.to_path_buf(), e)),
            }
            return chown(dest, node);
        }
        _ => {}
    }

    if opts.force {
        match fs::remove_file(dest) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) if e.kind() == std::io::ErrorKind::IsADirectory => {}
            Err(e) if e.raw_os_error() == Some(libc::EISDIR) => {}
            Err(e) => return Err(InstallError::Remove(dest.to_path_buf(), e)),
        }
    }

    match node.kind {
        Some(NodeKind::Block) | Some(NodeKind::Char) => {
            let kind = if node.kind == Some(NodeKind::Block) { SFlag::S_IFBLK } else { SFlag::S_IFCHR };
            match mknod(dest, kind, mode, node.rdev) {
                Ok(()) => {
                    if opts.verbose {
                        tracing::info!(path = %dest.display(), "install (device file)");
                    }
                }
                Err(Errno::EEXIST) => {
                    if opts.verbose {
                        tracing::info!(path = %dest.display(), "skip (device file)");
                    }
                }
                Err(e) => return Err(InstallError::Mknod(dest.to_path_buf(), e)),
            }
            return chown(dest, node);
        }
        Some(NodeKind::Symlink) => {
            let target = node.symlink_target.as_deref().unwrap_or_default();
            match std::os::unix::fs::symlink(target, dest) {
                Ok(()) => {
                    if opts.verbose {
                        tracing::info!(path = %dest.display(), "install (symlink)");
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if opts.verbose {
                        tracing::info!(path = %dest.display(), "skip (symlink)");
                    }
                }
                Err(e) => return Err(InstallError::Symlink(dest.to_path_buf(), e)),
            }
            return chown(dest, node);
        }
        Some(NodeKind::Fifo) => {
            match mkfifo(dest, mode) {
                Ok(()) => {
                    if opts.verbose {
                        tracing::info!(path = %dest.display(), "install (fifo)");
                    }
                }
                Err(Errno::EEXIST) => {
                    if opts.verbose {
                        tracing::info!(path = %dest.display(), "skip (fifo)");
                    }
                }
                Err(e) => return Err(InstallError::Mkfifo(dest.to_path_buf(), e)),
            }
            return chown(dest, node);
        }
        Some(NodeKind::Socket) => {
            UnixListener::bind(dest).map_err(|e| InstallError::Socket(dest.to_path_buf(), e))?;
            fs::set_permissions(dest, std::os::unix::fs::PermissionsExt::from_mode(node.mode & 0o7777))
                .map_err(|e| InstallError::Socket(dest.to_path_buf(), e))?;
            if opts.verbose {
                tracing::info!(path = %dest.display(), "install (socket)");
            }
            return chown(dest, node);
        }
        Some(NodeKind::Regular) => {}
        Some(NodeKind::Directory) => unreachable!("directories handled above"),
        None => return Err(InstallError::Unsupported(dest.to_path_buf())),
    }

    if nix::unistd::access(dest, AccessFlags::X_OK).is_ok() {
        if opts.verbose {
            tracing::info!(path = %dest.display(), "skip (file)");
        }
        return chown(dest, node);
    }

    let dst_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(node.mode & 0o7777)
        .open(dest)
        .map_err(|e| InstallError::Create(dest.to_path_buf(), e))?;
    if opts.verbose {
        tracing::info!(path = %dest.display(), "install (file)");
    }

    let src_file = fs::File::open(&node.source).map_err(|e| InstallError::OpenSource(node.source.clone(), e))?;

    let mut remaining = node.size as usize;
    while remaining > 0 {
        let copied = nix::fcntl::copy_file_range(src_file.as_fd(), None, dst_file.as_fd(), None, remaining)
            .map_err(|e| InstallError::Copy(node.source.clone(), dest.to_path_buf(), e))?;
        if copied == 0 {
            break;
        }
        remaining -= copied;
    }

    chown(dest, node)
}

fn chown(dest: &Path, node: &FileNode) -> Result<(), InstallError> {
    match fchownat(None, dest, Some(Uid::from_raw(node.uid)), Some(Gid::from_raw(node.gid)), AtFlags::AT_SYMLINK_NOFOLLOW) {
        Ok(()) | Err(Errno::EPERM) => Ok(()),
        Err(e) => Err(InstallError::Chown(dest.to_path_buf(), e)),
    }
}

#[cfg(test)]
#[path = "installer_tests.rs"]
mod tests;
