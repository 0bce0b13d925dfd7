//! Engine core: local edits in, relayable actions out.
//!
//! Every local operation mutates the store first and returns the
//! [`Action`]s the host must relay to the room. Peers apply those actions as
//! [`RemoteChange`]s, and since the relay never echoes an event back to its
//! sender an edit is applied exactly once on every replica.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use crate::doc::{CanvasObject, ObjectId, ObjectPatch, ObjectUpdate};
use crate::gesture::GestureState;
use crate::input::{Key, Modifiers, Point, Shortcut, Tool};
use crate::store::{CanvasStore, RemoteChange};
use crate::style::ToolStyles;

/// Actions returned from handlers for the host to relay.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ObjectAdded(CanvasObject),
    ObjectUpdated(ObjectUpdate),
    ObjectDeleted { id: ObjectId },
    CanvasReset,
    Undo,
    Redo,
}

/// All canvas state of one client.
#[derive(Debug, Default)]
pub struct EngineCore {
    pub store: CanvasStore,
    pub styles: ToolStyles,
    pub tool: Tool,
    pub gesture: GestureState,
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Data inputs ---

    /// Apply a change relayed from a peer. Returns whether the store changed.
    pub fn apply_remote(&mut self, change: RemoteChange) -> bool {
        self.store.apply_remote(change)
    }

    // --- Tools ---

    /// Switch tools; an unfinished gesture is discarded.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.gesture = GestureState::Idle;
    }

    // --- Pointer ---

    /// With a selection the press only deselects; otherwise it starts a
    /// gesture for the active tool.
    pub fn on_pointer_down(&mut self, at: Point) -> Vec<Action> {
        if self.store.selected().is_some() {
            self.store.select(None);
            return Vec::new();
        }
        self.gesture = GestureState::begin(self.tool, at, &self.styles);
        Vec::new()
    }

    pub fn on_pointer_move(&mut self, at: Point) -> Vec<Action> {
        self.gesture.extend(at);
        Vec::new()
    }

    /// Commit the gesture. Shapes and text boxes end up selected and the
    /// tool reverts to select; pen and eraser stay active.
    pub fn on_pointer_up(&mut self) -> Vec<Action> {
        let Some(object) = self.gesture.finish() else {
            return Vec::new();
        };
        let Ok(added) = self.store.add_object(object) else {
            return Vec::new();
        };
        let added = added.clone();
        if self.tool.is_placement() {
            self.store.select(Some(added.id().to_owned()));
            self.tool = Tool::Select;
        }
        vec![Action::ObjectAdded(added)]
    }

    // --- Edits ---

    /// Patch an existing object (move, resize, restyle, edit text).
    pub fn update_object(&mut self, id: &str, patch: ObjectPatch) -> Vec<Action> {
        if self.store.update_object(id, &patch).is_none() {
            return Vec::new();
        }
        vec![Action::ObjectUpdated(ObjectUpdate { id: id.to_owned(), patch })]
    }

    pub fn delete_selected(&mut self) -> Vec<Action> {
        let Some(id) = self.store.selected().map(str::to_owned) else {
            return Vec::new();
        };
        match self.store.delete_object(&id) {
            Some(_) => vec![Action::ObjectDeleted { id }],
            None => Vec::new(),
        }
    }

    pub fn reset(&mut self) -> Vec<Action> {
        self.gesture = GestureState::Idle;
        self.store.reset_canvas();
        vec![Action::CanvasReset]
    }

    /// Undo locally; relayed only when a step was taken.
    pub fn undo(&mut self) -> Vec<Action> {
        if self.store.undo() { vec![Action::Undo] } else { Vec::new() }
    }

    pub fn redo(&mut self) -> Vec<Action> {
        if self.store.redo() { vec![Action::Redo] } else { Vec::new() }
    }

    // --- Keyboard ---

    pub fn on_key_down(&mut self, key: &Key, mods: Modifiers) -> Vec<Action> {
        match Shortcut::from_key(key, mods) {
            Some(Shortcut::DeleteSelection) => self.delete_selected(),
            Some(Shortcut::Undo) => self.undo(),
            Some(Shortcut::Redo) => self.redo(),
            None => Vec::new(),
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.store.selected()
    }

    #[must_use]
    pub fn object(&self, id: &str) -> Option<&CanvasObject> {
        self.store.get(id)
    }

    /// Committed objects followed by the in-progress one, in draw order.
    #[must_use]
    pub fn scene(&self) -> Vec<&CanvasObject> {
        self.store.objects().iter().chain(self.gesture.preview()).collect()
    }
}
