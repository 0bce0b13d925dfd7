//! Undo/redo history as stacks of whole object-list snapshots.
//!
//! A mutation records the pre-mutation list on the undo stack and clears the
//! redo stack. Undo and redo swap the current list with the top of one stack
//! and push it on the other, so N undos followed by N redos restore the list
//! exactly.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use serde::{Deserialize, Serialize};

use crate::doc::CanvasObject;

/// One full copy of the object list.
pub type Frame = Vec<CanvasObject>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    undo: Vec<Frame>,
    redo: Vec<Frame>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stacks received in a snapshot (bottom first).
    #[must_use]
    pub fn from_stacks(undo: Vec<Frame>, redo: Vec<Frame>) -> Self {
        Self { undo, redo }
    }

    /// Record `current` before it is mutated.
    pub fn record(&mut self, current: &[CanvasObject]) {
        self.undo.push(current.to_vec());
        self.redo.clear();
    }

    /// Step back. Returns false when there is nothing to undo.
    pub fn undo(&mut self, current: &mut Frame) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        self.redo.push(std::mem::replace(current, previous));
        true
    }

    /// Step forward. Returns false when there is nothing to redo.
    pub fn redo(&mut self, current: &mut Frame) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push(std::mem::replace(current, next));
        true
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_stack(&self) -> &[Frame] {
        &self.undo
    }

    #[must_use]
    pub fn redo_stack(&self) -> &[Frame] {
        &self.redo
    }
}
