//! JSONL drawing scripts.
//!
//! One stroke per line:
//!
//! ```text
//! {"tool":"rectangle","points":[{"x":10,"y":10},{"x":50,"y":60}],"color":"#ff0000","width":3}
//! {"points":[{"x":0,"y":0},{"x":5,"y":2},{"x":9,"y":7}]}
//! ```
//!
//! `tool` defaults to freehand; `color` and `width` default to whatever the
//! previous line left selected. Blank lines and lines starting with `#` are
//! skipped. Each stroke is replayed through the engine as pointer-down on the
//! first point, a move per remaining point, then pointer-up.

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;

use canvas::engine::{Action, EngineCore};
use canvas::input::Tool;
use frames::{Point, Rgb};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: {source}")]
    Json { line: usize, source: serde_json::Error },
    #[error("line {0}: stroke has no points")]
    NoPoints(usize),
    #[error("line {0}: stroke width must be positive")]
    BadWidth(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolName {
    #[default]
    Freehand,
    Line,
    Rectangle,
    Ellipse,
}

impl From<ToolName> for Tool {
    fn from(name: ToolName) -> Self {
        match name {
            ToolName::Freehand => Self::Freehand,
            ToolName::Line => Self::Line,
            ToolName::Rectangle => Self::Rectangle,
            ToolName::Ellipse => Self::Ellipse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Stroke {
    #[serde(default)]
    pub tool: ToolName,
    pub points: Vec<Point>,
    #[serde(default)]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub width: Option<f64>,
}

/// Parse one script line. `line_no` is 1-based and only used in errors.
///
/// # Errors
///
/// Malformed JSON, an empty point list, or a non-positive width.
pub fn parse_line(text: &str, line_no: usize) -> Result<Option<Stroke>, ScriptError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let stroke: Stroke =
        serde_json::from_str(trimmed).map_err(|source| ScriptError::Json { line: line_no, source })?;
    if stroke.points.is_empty() {
        return Err(ScriptError::NoPoints(line_no));
    }
    if stroke.width.is_some_and(|w| w.is_nan() || w <= 0.0) {
        return Err(ScriptError::BadWidth(line_no));
    }
    Ok(Some(stroke))
}

/// Replay `stroke` as pointer input and collect every resulting action.
pub fn play(engine: &mut EngineCore, stroke: &Stroke) -> Vec<Action> {
    engine.set_tool(stroke.tool.into());
    if let Some(color) = stroke.color {
        engine.set_stroke_color(color);
    }
    if let Some(width) = stroke.width {
        engine.set_stroke_width(width);
    }

    let Some((first, rest)) = stroke.points.split_first() else {
        return Vec::new();
    };
    let mut actions = engine.on_pointer_down(*first);
    for point in rest {
        actions.extend(engine.on_pointer_move(*point));
    }
    actions.extend(engine.on_pointer_up());
    actions
}
