//! Shared constants for the canvas crate.

// ── Shapes ──────────────────────────────────────────────────────

/// Width of a shape placed without dragging.
pub const SHAPE_DEFAULT_WIDTH: f64 = 50.0;

/// Height of a shape placed without dragging.
pub const SHAPE_DEFAULT_HEIGHT: f64 = 50.0;

/// Default triangle height; equilateral for the default width.
pub const TRIANGLE_DEFAULT_HEIGHT: f64 = 43.3;

/// Smallest width or height a dragged shape or text box may have.
pub const SHAPE_MIN_SIZE: f64 = 5.0;

// ── Text ────────────────────────────────────────────────────────

pub const TEXT_DEFAULT_WIDTH: f64 = 200.0;
pub const TEXT_DEFAULT_HEIGHT: f64 = 40.0;

/// Placeholder content of a freshly placed text box.
pub const TEXT_PLACEHOLDER: &str = "Double click to edit.";

// ── Tool style defaults ─────────────────────────────────────────

pub const INK_WIDTH: f64 = 5.0;
pub const INK_COLOR: &str = "#2986cc";
pub const ERASER_SIZE: f64 = 5.0;

pub const BORDER_WIDTH: f64 = 2.0;
pub const BORDER_COLOR: &str = "#2986CC";
/// Fully transparent white.
pub const FILL_COLOR: &str = "#FFFFFF00";

pub const TEXT_SIZE: f64 = 28.0;
pub const TEXT_COLOR: &str = "#000000";
pub const TEXT_ALIGN: &str = "left";
pub const LINE_SPACING: f64 = 1.5;
pub const FONT_FAMILY: &str = "Arial";
