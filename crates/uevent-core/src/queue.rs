// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue bookkeeping and basedir reconciliation (spec §3 Queue/QueueSet,
//! §4.4).
//!
//! This module never touches the filesystem or inotify itself — the
//! supervisor supplies the current directory listing and two callbacks
//! (`register`/`unregister`) that install or tear down the actual watch.
//! That keeps the reconciliation diff (and its ordering/preservation
//! guarantees) unit-testable without a real inotify fd.

use crate::Pid;

/// Opaque watch handle for a queue directory. In `uevent-daemon` this is an
/// inotify watch descriptor; here it's just a value the caller hands back
/// unchanged.
pub type WatchId = i32;

/// One entry from a basedir listing: a queue's name and whether its
/// directory currently contains at least one regular, non-dotfile entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    pub name: String,
    pub non_empty: bool,
}

/// A single queue's supervisor-owned state (spec §3 Queue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queue {
    pub name: String,
    pub watch: WatchId,
    pub dirty: bool,
    pub worker: Option<Pid>,
}

impl Queue {
    pub fn is_busy(&self) -> bool {
        self.worker.is_some()
    }
}

/// Ordered collection of queues keyed by name, reconciled against basedir
/// listings (spec §3 QueueSet, §4.4).
#[derive(Debug, Default)]
pub struct QueueSet {
    queues: Vec<Queue>,
}

impl QueueSet {
    pub fn new() -> Self {
        Self { queues: Vec::new() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Queue> {
        self.queues.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Queue> {
        self.queues.iter_mut()
    }

    pub fn get(&self, name: &str) -> Option<&Queue> {
        self.queues.iter().find(|q| q.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Queue> {
        self.queues.iter_mut().find(|q| q.name == name)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Reconcile against `current` (a basedir listing, assumed sorted by
    /// name). Preserves existing entries verbatim for names that still
    /// exist; registers new watches for additions (marking them dirty when
    /// their directory is non-empty); unregisters watches for removals.
    ///
    /// Short-circuits with no allocation when the sorted name list is
    /// unchanged (spec §4.4 Optimisation).
    pub fn reconcile<R, U>(&mut self, current: &[QueueInfo], mut register: R, mut unregister: U)
    where
        R: FnMut(&str) -> WatchId,
        U: FnMut(WatchId),
    {
        if self.names_match(current) {
            tracing::debug!("queues have not changed");
            return;
        }

        let mut old: Vec<Queue> = std::mem::take(&mut self.queues);
        let mut new_queues = Vec::with_capacity(current.len());

        for info in current {
            if let Some(pos) = old.iter().position(|q| q.name == info.name) {
                let preserved = old.remove(pos);
                tracing::debug!(queue = %info.name, "preserve queue");
                new_queues.push(preserved);
            } else {
                tracing::debug!(queue = %info.name, "add queue");
                let watch = register(&info.name);
                new_queues.push(Queue {
                    name: info.name.clone(),
                    watch,
                    dirty: info.non_empty,
                    worker: None,
                });
            }
        }

        for leftover in old {
            tracing::debug!(queue = %leftover.name, "remove queue");
            unregister(leftover.watch);
        }

        self.queues = new_queues;
    }

    fn names_match(&self, current: &[QueueInfo]) -> bool {
        self.queues.len() == current.len()
            && self
                .queues
                .iter()
                .zip(current.iter())
                .all(|(q, info)| q.name == info.name)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
