//! Per-client tool styles. Not synchronized: each client stamps its own
//! styles onto the objects it creates.

#[cfg(test)]
#[path = "style_test.rs"]
mod style_test;

use crate::consts;

/// Text emphasis toggles.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextEmphasis {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

impl TextEmphasis {
    /// Value of the `fontStyle` attribute.
    #[must_use]
    pub fn font_style(self) -> &'static str {
        match (self.italic, self.bold) {
            (true, true) => "italic bold",
            (true, false) => "italic",
            (false, true) => "bold",
            (false, false) => "normal",
        }
    }

    /// Value of the `textDecoration` attribute.
    #[must_use]
    pub fn text_decoration(self) -> &'static str {
        match (self.underline, self.strikethrough) {
            (true, true) => "underline line-through",
            (true, false) => "underline",
            (false, true) => "line-through",
            (false, false) => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolStyles {
    pub ink_color: String,
    pub ink_width: f64,
    pub eraser_size: f64,
    pub border_color: String,
    pub border_width: f64,
    pub fill_color: String,
    pub text_color: String,
    pub text_size: f64,
    pub text_align: String,
    pub line_spacing: f64,
    pub text_emphasis: TextEmphasis,
    pub font_family: String,
}

impl Default for ToolStyles {
    fn default() -> Self {
        Self {
            ink_color: consts::INK_COLOR.into(),
            ink_width: consts::INK_WIDTH,
            eraser_size: consts::ERASER_SIZE,
            border_color: consts::BORDER_COLOR.into(),
            border_width: consts::BORDER_WIDTH,
            fill_color: consts::FILL_COLOR.into(),
            text_color: consts::TEXT_COLOR.into(),
            text_size: consts::TEXT_SIZE,
            text_align: consts::TEXT_ALIGN.into(),
            line_spacing: consts::LINE_SPACING,
            text_emphasis: TextEmphasis::default(),
            font_family: consts::FONT_FAMILY.into(),
        }
    }
}
