//! Client-side replica and edit engine for a shared drawing room.
//!
//! This crate holds everything a drawing client needs between the raw pointer
//! events of its host and the relay connection: the local mirror of the room's
//! shape log, the gesture state machine that turns pointer input into
//! committed shapes, and the local undo/redo history. It performs no I/O. The
//! host feeds it pointer input and decoded server events and carries out the
//! returned [`engine::Action`]s (transmit an event, repaint, show an error).
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::EngineCore`], the single entry point for hosts |
//! | [`doc`] | Ordered shape replica with amend-or-append semantics |
//! | [`input`] | Drawing tools and the gesture state machine |
//! | [`history`] | Local-only undo/redo stacks of replica snapshots |
//! | [`consts`] | Shared defaults (history depth, stroke width) |

pub mod consts;
pub mod doc;
pub mod engine;
pub mod history;
pub mod input;
