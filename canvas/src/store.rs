//! Local replica of a room's canvas.
//!
//! DESIGN
//! ======
//! `CanvasStore` owns the ordered object list (insertion order is draw
//! order), the undo/redo [`History`] and the selected object id. Local edits
//! and edits received from peers go through the same operations, so a
//! replica that applies the same sequence of changes ends with the same list
//! and stacks as the peer that produced it.
//!
//! Remote changes arrive as [`RemoteChange`]. Updates and deletes for ids
//! this replica never saw are no-ops; a remote add that reuses an existing id
//! is ignored.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::doc::{CanvasObject, ObjectId, ObjectPatch, ObjectUpdate};
use crate::history::{Frame, History};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object {0} already exists")]
    DuplicateId(ObjectId),
    #[error("invalid canvas payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Whole canvas state handed to a late joiner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub objects: Vec<CanvasObject>,
    pub undo: Vec<Frame>,
    pub redo: Vec<Frame>,
}

impl Snapshot {
    /// Decode the `snapshot` body of a `canvas-snapshot` event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPayload`] when `value` is not a snapshot.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode for a `canvas-snapshot` event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPayload`] if serialization fails.
    pub fn to_value(&self) -> Result<Value, StoreError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A change received from a peer.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    Add(CanvasObject),
    Update(ObjectUpdate),
    Delete(ObjectId),
    Reset,
    Undo,
    Redo,
    Snapshot(Snapshot),
}

impl RemoteChange {
    /// Decode the `object` of an `add-canvas-object` event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPayload`] for an unknown kind or missing attributes.
    pub fn add(object: Value) -> Result<Self, StoreError> {
        Ok(Self::Add(serde_json::from_value(object)?))
    }

    /// Decode the `object` of an `update-canvas-object` event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPayload`] when the object has no `id`.
    pub fn update(object: Value) -> Result<Self, StoreError> {
        Ok(Self::Update(serde_json::from_value(object)?))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CanvasStore {
    objects: Vec<CanvasObject>,
    history: History,
    selected: Option<ObjectId>,
}

impl CanvasStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Mutations ---

    /// Append a new object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if an object with the same id exists.
    pub fn add_object(&mut self, object: CanvasObject) -> Result<&CanvasObject, StoreError> {
        if self.position(object.id()).is_some() {
            return Err(StoreError::DuplicateId(object.id().to_owned()));
        }
        self.history.record(&self.objects);
        self.objects.push(object);
        let index = self.objects.len() - 1;
        Ok(&self.objects[index])
    }

    /// Merge `patch` into the object with `id`. Returns `None` (and records
    /// nothing) when the object is absent.
    pub fn update_object(&mut self, id: &str, patch: &ObjectPatch) -> Option<&CanvasObject> {
        let index = self.position(id)?;
        self.history.record(&self.objects);
        self.objects[index].apply(patch);
        Some(&self.objects[index])
    }

    /// Remove the object with `id`, clearing the selection if it pointed at
    /// it. Returns `None` (and records nothing) when the object is absent.
    pub fn delete_object(&mut self, id: &str) -> Option<CanvasObject> {
        let index = self.position(id)?;
        self.history.record(&self.objects);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Some(self.objects.remove(index))
    }

    /// Clear objects, history and selection.
    pub fn reset_canvas(&mut self) {
        self.objects.clear();
        self.history.clear();
        self.selected = None;
    }

    pub fn undo(&mut self) -> bool {
        let stepped = self.history.undo(&mut self.objects);
        if stepped {
            self.drop_stale_selection();
        }
        stepped
    }

    pub fn redo(&mut self) -> bool {
        let stepped = self.history.redo(&mut self.objects);
        if stepped {
            self.drop_stale_selection();
        }
        stepped
    }

    /// Apply a change received from a peer. Returns whether anything changed.
    pub fn apply_remote(&mut self, change: RemoteChange) -> bool {
        match change {
            RemoteChange::Add(object) => self.add_object(object).is_ok(),
            RemoteChange::Update(update) => self.update_object(&update.id, &update.patch).is_some(),
            RemoteChange::Delete(id) => self.delete_object(&id).is_some(),
            RemoteChange::Reset => {
                self.reset_canvas();
                true
            }
            RemoteChange::Undo => self.undo(),
            RemoteChange::Redo => self.redo(),
            RemoteChange::Snapshot(snapshot) => {
                self.load_snapshot(snapshot);
                true
            }
        }
    }

    // --- Selection ---

    /// Select an object, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<ObjectId>) {
        self.selected = id;
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    // --- Queries ---

    /// All objects in draw order.
    #[must_use]
    pub fn objects(&self) -> &[CanvasObject] {
        &self.objects
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CanvasObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Snapshots ---

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            objects: self.objects.clone(),
            undo: self.history.undo_stack().to_vec(),
            redo: self.history.redo_stack().to_vec(),
        }
    }

    /// Replace objects and both stacks; the selection is cleared.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.objects = snapshot.objects;
        self.history = History::from_stacks(snapshot.undo, snapshot.redo);
        self.selected = None;
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == id)
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = self.selected.as_deref() {
            if self.position(id).is_none() {
                self.selected = None;
            }
        }
    }
}
