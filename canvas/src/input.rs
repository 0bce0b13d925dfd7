//! Input model: pointer positions, tools, modifier keys and shortcuts.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of an event.
//! `Shortcut::from_key` maps a key press to the board command it triggers,
//! covering both the Ctrl (Windows/Linux) and Meta (macOS) conventions.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::doc::ShapeName;

/// A position in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool.
    Select,
    /// Freehand ink (default).
    #[default]
    Pen,
    Eraser,
    /// Place a shape of the given kind.
    Shape(ShapeName),
    /// Place a text box.
    Text,
}

impl Tool {
    /// Whether the tool draws a freehand stroke.
    #[must_use]
    pub fn is_stroke(self) -> bool {
        matches!(self, Self::Pen | Self::Eraser)
    }

    /// Whether the tool places a boxed object (shape or text).
    #[must_use]
    pub fn is_placement(self) -> bool {
        matches!(self, Self::Shape(_) | Self::Text)
    }
}

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key.
    pub meta: bool,
}

/// A keyboard key as reported by the host (e.g. `"Delete"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Board command bound to a key chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    DeleteSelection,
    Undo,
    Redo,
}

impl Shortcut {
    /// `Delete` or `Meta+Backspace` deletes, `Ctrl+Z` or `Meta+Z` undoes,
    /// `Ctrl+Y` or `Meta+Shift+Z` redoes.
    #[must_use]
    pub fn from_key(key: &Key, mods: Modifiers) -> Option<Self> {
        match key.0.as_str() {
            "Delete" => Some(Self::DeleteSelection),
            "Backspace" if mods.meta => Some(Self::DeleteSelection),
            "z" | "Z" if mods.meta && mods.shift => Some(Self::Redo),
            "z" | "Z" if mods.ctrl || mods.meta => Some(Self::Undo),
            "y" | "Y" if mods.ctrl => Some(Self::Redo),
            _ => None,
        }
    }
}
