//! Bounded undo/redo stacks of [`PatchSet`]s with batching.
//!
//! Mutations recorded between [`begin_batch`](UndoHistory::begin_batch) and the
//! matching [`end_batch`](UndoHistory::end_batch) become one patch set. Batches
//! nest; only the outermost `end_batch` commits.

use std::collections::VecDeque;

use crate::patch::{Mutation, PatchSet};

/// Undo and redo stacks.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo_stack: VecDeque<PatchSet>,
    redo_stack: VecDeque<PatchSet>,
    max_depth: usize,
    open: Option<PatchSet>,
    batch_depth: usize,
}

impl UndoHistory {
    /// Creates empty stacks holding at most `max_depth` sets each.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth: max_depth.max(1),
            open: None,
            batch_depth: 0,
        }
    }

    /// Opens a batch (or nests inside the open one).
    pub fn begin_batch(&mut self) {
        if self.batch_depth == 0 {
            self.open = Some(PatchSet::new());
        }
        self.batch_depth += 1;
    }

    /// Closes a batch. The outermost close commits the collected set if it is
    /// non-empty and returns `true` when it did.
    pub fn end_batch(&mut self) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return false;
        }
        match self.open.take() {
            Some(set) if !set.is_empty() => {
                self.push(set);
                true
            }
            _ => false,
        }
    }

    /// Returns `true` while a batch is open.
    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Records one mutation pair. Outside a batch it becomes its own set.
    pub fn record(&mut self, forward: Mutation, inverse: Mutation) {
        if let Some(open) = self.open.as_mut() {
            open.record(forward, inverse);
        } else {
            let mut set = PatchSet::new();
            set.record(forward, inverse);
            self.push(set);
        }
    }

    /// Pushes a committed set onto the undo stack and clears redo.
    pub fn push(&mut self, set: PatchSet) {
        push_bounded(&mut self.undo_stack, set, self.max_depth);
        self.redo_stack.clear();
    }

    /// Takes the most recent set for undoing.
    pub fn pop_undo(&mut self) -> Option<PatchSet> {
        self.undo_stack.pop_back()
    }

    /// Takes the most recently undone set for redoing.
    pub fn pop_redo(&mut self) -> Option<PatchSet> {
        self.redo_stack.pop_back()
    }

    /// Stores an undone set so it can be redone.
    pub fn push_redo(&mut self, set: PatchSet) {
        push_bounded(&mut self.redo_stack, set, self.max_depth);
    }

    /// Stores a redone set so it can be undone again, keeping redo intact.
    pub fn push_undo_keep_redo(&mut self, set: PatchSet) {
        push_bounded(&mut self.undo_stack, set, self.max_depth);
    }

    /// Drops every set, including an open batch.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        if let Some(open) = self.open.as_mut() {
            *open = PatchSet::new();
        }
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable sets.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable sets.
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Maximum depth of each stack.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

fn push_bounded(stack: &mut VecDeque<PatchSet>, set: PatchSet, max_depth: usize) {
    if stack.len() >= max_depth {
        stack.pop_front();
    }
    stack.push_back(set);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(path: &str) -> Mutation {
        Mutation::remove(path)
    }

    #[test]
    fn record_outside_batch_commits_immediately() {
        let mut h = UndoHistory::new(10);
        h.record(m("/nodes/0"), m("/inv"));
        h.record(m("/nodes/1"), m("/inv"));
        assert_eq!(h.undo_len(), 2);
    }

    #[test]
    fn nested_batches_flatten() {
        let mut h = UndoHistory::new(10);
        h.begin_batch();
        h.record(m("/nodes/0"), m("/inv"));
        h.begin_batch();
        h.record(m("/nodes/1"), m("/inv"));
        assert!(!h.end_batch());
        assert_eq!(h.undo_len(), 0);
        assert!(h.end_batch());
        assert_eq!(h.undo_len(), 1);
        assert_eq!(h.pop_undo().unwrap().len(), 2);
    }

    #[test]
    fn empty_batch_commits_nothing() {
        let mut h = UndoHistory::new(10);
        h.begin_batch();
        assert!(!h.end_batch());
        assert!(!h.can_undo());
        assert!(!h.end_batch());
    }

    #[test]
    fn oldest_discarded_beyond_depth() {
        let mut h = UndoHistory::new(3);
        for i in 0..5 {
            h.record(m(&format!("/nodes/{i}")), m("/inv"));
        }
        assert_eq!(h.undo_len(), 3);
        let oldest = h.undo_stack.front().unwrap();
        assert_eq!(oldest.forward[0].path, "/nodes/2");
    }

    #[test]
    fn new_record_clears_redo() {
        let mut h = UndoHistory::new(10);
        h.record(m("/nodes/0"), m("/inv"));
        let set = h.pop_undo().unwrap();
        h.push_redo(set);
        assert!(h.can_redo());
        h.record(m("/nodes/1"), m("/inv"));
        assert!(!h.can_redo());
    }

    #[test]
    fn redo_push_keeps_redo_stack() {
        let mut h = UndoHistory::new(10);
        h.push_redo(PatchSet::new());
        h.push_redo(PatchSet::new());
        let set = h.pop_redo().unwrap();
        h.push_undo_keep_redo(set);
        assert_eq!(h.redo_len(), 1);
        assert_eq!(h.undo_len(), 1);
    }

    #[test]
    fn clear_empties_both_stacks() {
        let mut h = UndoHistory::new(10);
        h.record(m("/nodes/0"), m("/inv"));
        h.push_redo(PatchSet::new());
        h.clear();
        assert!(!h.can_undo());
        assert!(!h.can_redo());
    }
}
