//! Local undo/redo history.
//!
//! History stores whole-replica snapshots, not operations. It is never
//! transmitted: undoing changes only this client's view of the room until its
//! next committed edit reaches the relay.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use frames::Shape;

use crate::consts::DEFAULT_HISTORY_LIMIT;

/// Linear undo/redo stacks of replica snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Vec<Shape>>,
    redo: VecDeque<Vec<Shape>>,
    limit: usize,
}

impl History {
    /// Create an empty history keeping at most `limit` snapshots per stack.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { undo: VecDeque::new(), redo: VecDeque::new(), limit: limit.max(1) }
    }

    /// Record the pre-edit collection of a new commit. Clears the redo stack.
    pub fn record(&mut self, before: Vec<Shape>) {
        push_bounded(&mut self.undo, before, self.limit);
        self.redo.clear();
    }

    /// Pop the most recent snapshot, stashing `current` for redo.
    ///
    /// Returns `None` (and keeps `current` out of the redo stack) when there
    /// is nothing to undo.
    pub fn undo(&mut self, current: Vec<Shape>) -> Option<Vec<Shape>> {
        let previous = self.undo.pop_back()?;
        push_bounded(&mut self.redo, current, self.limit);
        Some(previous)
    }

    /// Inverse of [`History::undo`].
    pub fn redo(&mut self, current: Vec<Shape>) -> Option<Vec<Shape>> {
        let next = self.redo.pop_back()?;
        push_bounded(&mut self.undo, current, self.limit);
        Some(next)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Forget everything, e.g. when switching rooms.
    pub fn reset(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

fn push_bounded(stack: &mut VecDeque<Vec<Shape>>, snapshot: Vec<Shape>, limit: usize) {
    if stack.len() == limit {
        stack.pop_front();
    }
    stack.push_back(snapshot);
}
