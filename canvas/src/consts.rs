//! Shared defaults for the canvas crate.

// ── History ─────────────────────────────────────────────────────

/// Maximum number of snapshots retained on the undo stack.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

// ── Style ───────────────────────────────────────────────────────

/// Stroke width applied to new shapes until the host picks another.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
