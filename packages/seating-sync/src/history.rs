//! Linear undo/redo over layout snapshots.
//!
//! A single pointer indexes the snapshot list. `push` drops everything after
//! the pointer before appending, so a new edit discards the redo future.
//! Navigation never writes anything; committing a snapshot is up to the
//! caller.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::model::CeremonySeat;
use crate::topology::Topology;

/// Default number of snapshots retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// An immutable layout state.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutSnapshot {
    Banquet(Arc<Topology>),
    Ceremony(Arc<[CeremonySeat]>),
}

impl LayoutSnapshot {
    pub fn banquet(topology: Topology) -> Self {
        LayoutSnapshot::Banquet(Arc::new(topology))
    }

    pub fn ceremony(seats: Vec<CeremonySeat>) -> Self {
        LayoutSnapshot::Ceremony(seats.into())
    }
}

#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    pointer: Option<usize>,
    limit: usize,
}

impl<T: Clone> History<T> {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// History keeping at most `limit` snapshots (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            pointer: None,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record a new snapshot at the pointer, discarding any redo entries.
    pub fn push(&mut self, snapshot: T) {
        let keep = self.pointer.map_or(0, |p| p + 1);
        self.entries.truncate(keep);
        self.entries.push_back(snapshot);
        if self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.pointer = Some(self.entries.len() - 1);
    }

    /// Step back one snapshot. `None` at the first entry or when empty.
    pub fn undo(&mut self) -> Option<T> {
        match self.pointer {
            Some(p) if p > 0 => {
                self.pointer = Some(p - 1);
                self.entries.get(p - 1).cloned()
            }
            _ => None,
        }
    }

    /// Step forward one snapshot. `None` at the tip.
    pub fn redo(&mut self) -> Option<T> {
        let next = self.pointer?.checked_add(1)?;
        let snapshot = self.entries.get(next).cloned()?;
        self.pointer = Some(next);
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.pointer, Some(p) if p > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.pointer, Some(p) if p + 1 < self.entries.len())
    }

    /// Snapshot under the pointer.
    pub fn current(&self) -> Option<&T> {
        self.pointer.and_then(|p| self.entries.get(p))
    }
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}
