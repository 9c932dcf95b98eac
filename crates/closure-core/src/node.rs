// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The node table: the dependency-closure work set (spec §3 Core B
//! entities, §4.11 Traversal engine).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;
const S_IFBLK: u32 = 0o060000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;
const S_IFSOCK: u32 = 0o140000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Regular,
    Symlink,
    Block,
    Char,
    Fifo,
    Socket,
}

impl NodeKind {
    /// Classify a `st_mode` value by its file-type bits. `None` for types
    /// this closure has no use for (spec §4.12 lists exactly these seven).
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFDIR => Some(Self::Directory),
            S_IFREG => Some(Self::Regular),
            S_IFLNK => Some(Self::Symlink),
            S_IFBLK => Some(Self::Block),
            S_IFCHR => Some(Self::Char),
            S_IFIFO => Some(Self::Fifo),
            S_IFSOCK => Some(Self::Socket),
            _ => None,
        }
    }

    /// The single-letter tag used in dry-run log lines (spec §4.12).
    pub fn tag(self) -> char {
        match self {
            Self::Block => 'b',
            Self::Char => 'c',
            Self::Directory => 'd',
            Self::Fifo => 'p',
            Self::Symlink => 'l',
            Self::Regular => 'f',
            Self::Socket => 's',
        }
    }
}

/// Raw stat fields a caller supplies after lstat'ing a path. Kept separate
/// from `FileNode` so injected closures (this crate never touches the
/// filesystem itself) have a narrow, obvious return type.
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub mode: u32,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub symlink_target: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileNode {
    pub source: PathBuf,
    pub kind: Option<NodeKind>,
    pub size: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub symlink_target: Option<String>,
    pub processed: bool,
}

impl FileNode {
    fn bare(source: PathBuf) -> Self {
        Self {
            source,
            kind: None,
            size: 0,
            mode: 0,
            uid: 0,
            gid: 0,
            rdev: 0,
            symlink_target: None,
            processed: false,
        }
    }

    fn apply(&mut self, meta: NodeMetadata) {
        self.kind = NodeKind::from_mode(meta.mode);
        self.mode = meta.mode;
        self.size = meta.size;
        self.uid = meta.uid;
        self.gid = meta.gid;
        self.rdev = meta.rdev;
        self.symlink_target = meta.symlink_target;
    }
}

#[derive(Debug, Error)]
pub enum NodeTableError {
    #[error("lstat {0}: {1}")]
    Stat(PathBuf, std::io::Error),
}

/// Deduplicated node set keyed by source path (spec §3 FileNode: "at most
/// one node per source path").
#[derive(Default)]
pub struct NodeTable {
    nodes: Vec<FileNode>,
    index: HashMap<PathBuf, usize>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[FileNode] {
        &self.nodes
    }

    pub fn get(&self, idx: usize) -> &FileNode {
        &self.nodes[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut FileNode {
        &mut self.nodes[idx]
    }

    /// Return the existing node for `path` or append a fresh, untyped,
    /// unprocessed one. This is the sole insertion point, so the
    /// dedup-by-exact-path invariant holds everywhere.
    pub fn append_path(&mut self, path: &Path) -> usize {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(FileNode::bare(path.to_path_buf()));
        self.index.insert(path.to_path_buf(), idx);
        idx
    }

    pub fn record_metadata(&mut self, idx: usize, meta: NodeMetadata) {
        self.nodes[idx].apply(meta);
    }

    pub fn mark_processed(&mut self, idx: usize) {
        self.nodes[idx].processed = true;
    }

    /// Indices of every node not yet processed, in table order (the work
    /// set the traversal engine drains — spec §3 Work set).
    pub fn unprocessed_indices(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.processed)
            .map(|(i, _)| i)
            .collect()
    }

    /// Walk from `path`'s parent up to `/`, stopping early at `strip_prefix`
    /// if given, creating and lstat'ing a directory node for each ancestor,
    /// then append `path` itself. `lstat` is the caller's filesystem probe.
    ///
    /// Ancestors already processed are left untouched (an ancestor shared
    /// by two seeds is only stat'd once). The walk includes the root `/`
    /// itself unless it coincides with `strip_prefix`.
    pub fn append_fullpath<F>(
        &mut self,
        path: &Path,
        strip_prefix: Option<&Path>,
        mut lstat: F,
    ) -> Result<usize, NodeTableError>
    where
        F: FnMut(&Path) -> std::io::Result<NodeMetadata>,
    {
        let mut ancestors = path.ancestors();
        ancestors.next(); // the leaf itself, appended unconditionally below

        for ancestor in ancestors {
            if let Some(prefix) = strip_prefix {
                if ancestor == prefix {
                    break;
                }
            }
            let idx = self.append_path(ancestor);
            if self.nodes[idx].processed {
                continue;
            }
            let meta = lstat(ancestor).map_err(|e| NodeTableError::Stat(ancestor.to_path_buf(), e))?;
            let is_dir = NodeKind::from_mode(meta.mode) == Some(NodeKind::Directory);
            self.record_metadata(idx, meta);
            if is_dir {
                self.mark_processed(idx);
            }
        }

        Ok(self.append_path(path))
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
