// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule (handler) scanning and classification (spec §3 Rule, §4.5).

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// An embedded scripting runtime is an opaque, out-of-scope collaborator
/// (spec §1): this crate only defines the seam a concrete implementation
/// would plug into.
pub trait ScriptHandler: Send {
    fn run(&self);
    fn run_post(&self);
}

/// Attempts to load `path` as an embedded script, returning `None` if the
/// content isn't recognised as one. Supplied by the caller so the
/// embedded-script variant stays opt-in (spec §4.5: "only when the
/// embedded-script variant is compiled in").
pub type ScriptLoader = fn(&Path) -> Option<Box<dyn ScriptHandler>>;

pub enum RuleKind {
    Shell,
    Script,
}

pub struct Rule {
    pub path: PathBuf,
    pub kind: RuleKind,
    pub script: Option<Box<dyn ScriptHandler>>,
}

#[derive(Debug, Error)]
pub enum RuleScanError {
    #[error("scandir: {0}: {1}")]
    ReadDir(PathBuf, std::io::Error),
    #[error("read: {0}: {1}")]
    ReadEntry(PathBuf, std::io::Error),
}

/// Stable, ordered set of handlers. Reload replaces the whole set; there is
/// no incremental update (spec §4.5).
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rescan `rulesdir`, replacing the entire rule set. Filters out dotfiles,
    /// backup/swap suffixes, and anything that classifies as neither a
    /// shell-executable nor an embedded script. Final order is descending by
    /// filename (spec §4.5: ascending scan, inserted head-first).
    pub fn scan(rulesdir: &Path, script_loader: Option<ScriptLoader>) -> Result<Self, RuleScanError> {
        let entries =
            fs::read_dir(rulesdir).map_err(|e| RuleScanError::ReadDir(rulesdir.to_path_buf(), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RuleScanError::ReadEntry(rulesdir.to_path_buf(), e))?;
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_rule_candidate(&name) {
                names.push(name);
            }
        }

        names.sort();

        let mut rules = Vec::with_capacity(names.len());
        for name in names.into_iter().rev() {
            let path = rulesdir.join(&name);
            if let Some(rule) = classify(&path, script_loader) {
                rules.push(rule);
            }
        }

        Ok(Self { rules })
    }
}

/// Filename filter: regular files only (checked by caller), excluding
/// dotfiles, trailing `~`, and `.#`/`.swp`/`.rpmnew`/`.rpmsave` suffixes.
fn is_rule_candidate(name: &str) -> bool {
    if name.is_empty() || name.starts_with('.') || name.ends_with('~') {
        return false;
    }
    if let Some(dot) = name.rfind('.') {
        let suffix = &name[dot..];
        if matches!(suffix, ".#" | ".swp" | ".rpmnew" | ".rpmsave") {
            return false;
        }
    }
    true
}

/// Classify one candidate file by its first three bytes and, for shell
/// scripts, its owner-execute bit (spec §4.5).
fn classify(path: &Path, script_loader: Option<ScriptLoader>) -> Option<Rule> {
    let mut buf = [0u8; 3];
    let n = read_prefix(path, &mut buf)?;

    if n == 3 && &buf == b"#!/" {
        let mode = fs::metadata(path).ok()?.permissions().mode();
        if mode & 0o100 != 0 {
            return Some(Rule {
                path: path.to_path_buf(),
                kind: RuleKind::Shell,
                script: None,
            });
        }
        return None;
    }

    if let Some(loader) = script_loader {
        if let Some(handler) = loader(path) {
            return Some(Rule {
                path: path.to_path_buf(),
                kind: RuleKind::Script,
                script: Some(handler),
            });
        }
    }

    None
}

fn read_prefix(path: &Path, buf: &mut [u8; 3]) -> Option<usize> {
    use std::io::Read;
    let mut f = fs::File::open(path).ok()?;
    let mut total = 0;
    while total < buf.len() {
        match f.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(_) => return None,
        }
    }
    Some(total)
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
