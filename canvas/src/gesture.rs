//! In-progress object between pointer-down and pointer-up.
//!
//! The object being drawn lives only here: it is not in the store, not on the
//! undo stack and never relayed. `finish` hands it over exactly once.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use crate::consts::{
    SHAPE_DEFAULT_HEIGHT, SHAPE_DEFAULT_WIDTH, SHAPE_MIN_SIZE, TEXT_DEFAULT_HEIGHT, TEXT_DEFAULT_WIDTH,
    TEXT_PLACEHOLDER, TRIANGLE_DEFAULT_HEIGHT,
};
use crate::doc::{CanvasObject, Shape, ShapeName, Stroke, TextBox, new_object_id};
use crate::input::{Point, Tool};
use crate::style::ToolStyles;

#[derive(Debug, Clone, Default)]
pub enum GestureState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A new object is being drawn from `origin`.
    Drawing { object: CanvasObject, origin: Point },
}

impl GestureState {
    /// Start a gesture for `tool` at `at`. The select tool starts nothing.
    #[must_use]
    pub fn begin(tool: Tool, at: Point, styles: &ToolStyles) -> Self {
        let object = match tool {
            Tool::Select => return Self::Idle,
            Tool::Pen => CanvasObject::Ink(Stroke {
                id: new_object_id(),
                points: vec![at.x, at.y],
                stroke: styles.ink_color.clone(),
                stroke_width: styles.ink_width,
            }),
            Tool::Eraser => CanvasObject::EraserStroke(Stroke {
                id: new_object_id(),
                points: vec![at.x, at.y],
                stroke: styles.ink_color.clone(),
                stroke_width: styles.eraser_size,
            }),
            Tool::Shape(shape_name) => CanvasObject::Shape(Shape {
                id: new_object_id(),
                shape_name,
                x: at.x,
                y: at.y,
                width: SHAPE_DEFAULT_WIDTH,
                height: if shape_name == ShapeName::Triangle { TRIANGLE_DEFAULT_HEIGHT } else { SHAPE_DEFAULT_HEIGHT },
                rotation: 0.0,
                stroke: styles.border_color.clone(),
                stroke_width: styles.border_width,
                fill: styles.fill_color.clone(),
            }),
            Tool::Text => CanvasObject::Text(TextBox {
                id: new_object_id(),
                x: at.x,
                y: at.y,
                width: TEXT_DEFAULT_WIDTH,
                height: TEXT_DEFAULT_HEIGHT,
                rotation: 0.0,
                text: TEXT_PLACEHOLDER.into(),
                fill: styles.text_color.clone(),
                font_size: styles.text_size,
                font_family: styles.font_family.clone(),
                font_style: styles.text_emphasis.font_style().into(),
                text_decoration: styles.text_emphasis.text_decoration().into(),
                align: styles.text_align.clone(),
                line_height: styles.line_spacing,
            }),
        };
        Self::Drawing { object, origin: at }
    }

    /// Extend the gesture to the pointer at `to`: strokes gain a point, boxed
    /// objects are sized to the drag distance.
    pub fn extend(&mut self, to: Point) {
        let Self::Drawing { object, origin } = self else {
            return;
        };
        let width = (to.x - origin.x).abs().max(SHAPE_MIN_SIZE);
        let height = (to.y - origin.y).abs().max(SHAPE_MIN_SIZE);
        match object {
            CanvasObject::Ink(stroke) | CanvasObject::EraserStroke(stroke) => {
                stroke.points.extend([to.x, to.y]);
            }
            CanvasObject::Shape(shape) => {
                if shape.shape_name == ShapeName::Star {
                    let side = width.min(height);
                    shape.width = side;
                    shape.height = side;
                } else {
                    shape.width = width;
                    shape.height = height;
                }
            }
            CanvasObject::Text(text) => {
                text.width = width;
                text.height = height;
            }
        }
    }

    /// End the gesture, returning the object to commit.
    pub fn finish(&mut self) -> Option<CanvasObject> {
        match std::mem::take(self) {
            Self::Idle => None,
            Self::Drawing { object, .. } => Some(object),
        }
    }

    /// The object being drawn, for previews.
    #[must_use]
    pub fn preview(&self) -> Option<&CanvasObject> {
        match self {
            Self::Idle => None,
            Self::Drawing { object, .. } => Some(object),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Drawing { .. })
    }
}
