//! Input model: drawing tools and the gesture state machine.
//!
//! A gesture runs from pointer-down to pointer-up. `InputState` is `Idle`
//! between gestures and `Drawing` while one is active; the `Gesture` carries
//! everything needed to build the shape on every move and on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use frames::{Geometry, Point, Rgb, Shape, ShapeId, ShapeKind, Style, UserId};

use crate::consts::DEFAULT_STROKE_WIDTH;

/// Which drawing tool is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Freehand pencil stroke (default).
    #[default]
    Freehand,
    /// Straight line segment.
    Line,
    /// Axis-aligned rectangle spanned by the drag.
    Rectangle,
    /// Ellipse spanned by the drag.
    Ellipse,
}

impl Tool {
    /// Shape kind this tool produces.
    #[must_use]
    pub fn kind(self) -> ShapeKind {
        match self {
            Self::Freehand => ShapeKind::Freehand,
            Self::Line => ShapeKind::Line,
            Self::Rectangle => ShapeKind::Rectangle,
            Self::Ellipse => ShapeKind::Ellipse,
        }
    }

    /// Whether the shape is fixed by a start/end pair and only committed on release.
    #[must_use]
    pub fn is_bounded(self) -> bool {
        !matches!(self, Self::Freehand)
    }
}

/// Persistent tool selection visible to the host.
#[derive(Debug, Clone, Copy)]
pub struct UiState {
    /// Currently active drawing tool.
    pub tool: Tool,
    /// Style applied to the next gesture.
    pub style: Style,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            style: Style { stroke_color: Rgb::WHITE, stroke_width: DEFAULT_STROKE_WIDTH },
        }
    }
}

/// One pointer gesture in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    /// Id allocated for the shape on pointer-down.
    pub id: ShapeId,
    pub tool: Tool,
    /// Style captured on pointer-down; later tool changes do not affect it.
    pub style: Style,
    pub start: Point,
    /// Last pointer position seen after pointer-down, if any.
    pub last: Option<Point>,
    /// Freehand stroke points, starting with `start`. Empty for bounded tools.
    pub points: Vec<Point>,
}

impl Gesture {
    #[must_use]
    pub fn begin(id: ShapeId, tool: Tool, style: Style, start: Point) -> Self {
        let points = if tool.is_bounded() { Vec::new() } else { vec![start] };
        Self { id, tool, style, start, last: None, points }
    }

    /// Record a pointer move. Freehand strokes grow by one point.
    pub fn advance(&mut self, point: Point) {
        self.last = Some(point);
        if !self.tool.is_bounded() {
            self.points.push(point);
        }
    }

    /// The shape this gesture describes so far.
    ///
    /// Bounded tools return `None` until the pointer has moved at least once.
    #[must_use]
    pub fn shape(&self, owner_id: &UserId) -> Option<Shape> {
        let geometry = if self.tool.is_bounded() {
            Geometry::from_points(self.tool.kind(), self.start, self.last?)
        } else {
            Geometry::Freehand { points: self.points.clone() }
        };
        Some(Shape { id: self.id.clone(), geometry, style: self.style, owner_id: owner_id.clone() })
    }
}

/// Gesture state machine: `Idle → Drawing → Idle`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A pointer is down and a shape is being drawn.
    Drawing(Gesture),
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
