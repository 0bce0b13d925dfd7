//! Document model: canvas objects and sparse patches.
//!
//! `CanvasObject` is the unit every replica stores and every peer relays. It
//! is a closed union over four kinds, serialized with a `type` tag and
//! camelCase attributes. `ObjectPatch` carries a sparse attribute set for
//! incremental edits; applying one never changes an object's id or kind.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};

/// Unique identifier for a canvas object (UUID v4 string on the wire).
pub type ObjectId = String;

/// Generate a fresh object id.
#[must_use]
pub fn new_object_id() -> ObjectId {
    uuid::Uuid::new_v4().to_string()
}

/// Geometric primitive of a shape object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeName {
    Rectangle,
    /// Ellipse inscribed in the bounding box.
    Oval,
    Triangle,
    /// Five-point star; kept square while drawing.
    Star,
}

/// Freehand polyline: ink or eraser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: ObjectId,
    /// Flat `[x0, y0, x1, y1, ...]` in world coordinates.
    pub points: Vec<f64>,
    pub stroke: String,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: ObjectId,
    pub shape_name: ShapeName,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    pub stroke: String,
    pub stroke_width: f64,
    pub fill: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBox {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    pub text: String,
    pub fill: String,
    pub font_size: f64,
    pub font_family: String,
    /// `normal`, `bold`, `italic` or `italic bold`.
    #[serde(default)]
    pub font_style: String,
    /// Empty, `underline`, `line-through` or both.
    #[serde(default)]
    pub text_decoration: String,
    pub align: String,
    pub line_height: f64,
}

/// A canvas object as stored in every replica and relayed between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CanvasObject {
    #[serde(rename = "ink")]
    Ink(Stroke),
    #[serde(rename = "eraserStroke")]
    EraserStroke(Stroke),
    #[serde(rename = "shape")]
    Shape(Shape),
    #[serde(rename = "text")]
    Text(TextBox),
}

impl CanvasObject {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Ink(s) | Self::EraserStroke(s) => &s.id,
            Self::Shape(s) => &s.id,
            Self::Text(t) => &t.id,
        }
    }

    /// Wire name of the object's kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ink(_) => "ink",
            Self::EraserStroke(_) => "eraserStroke",
            Self::Shape(_) => "shape",
            Self::Text(_) => "text",
        }
    }

    /// Shallow-merge `patch` into this object. Attributes the kind does not
    /// have are ignored.
    pub fn apply(&mut self, patch: &ObjectPatch) {
        match self {
            Self::Ink(s) | Self::EraserStroke(s) => {
                set(&mut s.points, patch.points.as_ref());
                set(&mut s.stroke, patch.stroke.as_ref());
                set(&mut s.stroke_width, patch.stroke_width.as_ref());
            }
            Self::Shape(s) => {
                set(&mut s.shape_name, patch.shape_name.as_ref());
                set(&mut s.x, patch.x.as_ref());
                set(&mut s.y, patch.y.as_ref());
                set(&mut s.width, patch.width.as_ref());
                set(&mut s.height, patch.height.as_ref());
                set(&mut s.rotation, patch.rotation.as_ref());
                set(&mut s.stroke, patch.stroke.as_ref());
                set(&mut s.stroke_width, patch.stroke_width.as_ref());
                set(&mut s.fill, patch.fill.as_ref());
            }
            Self::Text(t) => {
                set(&mut t.x, patch.x.as_ref());
                set(&mut t.y, patch.y.as_ref());
                set(&mut t.width, patch.width.as_ref());
                set(&mut t.height, patch.height.as_ref());
                set(&mut t.rotation, patch.rotation.as_ref());
                set(&mut t.text, patch.text.as_ref());
                set(&mut t.fill, patch.fill.as_ref());
                set(&mut t.font_size, patch.font_size.as_ref());
                set(&mut t.font_family, patch.font_family.as_ref());
                set(&mut t.font_style, patch.font_style.as_ref());
                set(&mut t.text_decoration, patch.text_decoration.as_ref());
                set(&mut t.align, patch.align.as_ref());
                set(&mut t.line_height, patch.line_height.as_ref());
            }
        }
    }
}

fn set<T: Clone>(field: &mut T, value: Option<&T>) {
    if let Some(v) = value {
        field.clone_from(v);
    }
}

/// Sparse update for a canvas object. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_name: Option<ShapeName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
}

/// A patch addressed to one object: the `object` body of an
/// `update-canvas-object` event. Unknown attributes (including `type`) are
/// ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectUpdate {
    pub id: ObjectId,
    #[serde(flatten)]
    pub patch: ObjectPatch,
}
