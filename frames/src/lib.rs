//! Shared shape model and JSON event codec for the realtime room relay.
//!
//! This crate owns the wire representation used by both the relay server and
//! its clients. Every websocket text frame carries exactly one event encoded as
//! `{"event": <name>, "data": <payload>}`. Event names are closed enums on both
//! sides, so a new event kind is a compile error everywhere it is not handled.
//!
//! Shape geometry is a closed tagged union keyed by `kind`; a frame with an
//! unrecognized kind, or geometry that does not match its kind, fails to decode
//! as a whole and is dropped by the receiver.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Room identifier chosen by the client that creates the room.
pub type RoomId = String;

/// Client-generated user identifier. Trusted as-is.
pub type UserId = String;

/// Globally unique shape identifier, allocated by the drawing client.
pub type ShapeId = String;

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by [`encode`] and [`decode`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text was not valid JSON or did not match a known event shape.
    #[error("invalid event json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error returned when parsing an [`Rgb`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}: expected #rrggbb")]
pub struct ColorError(pub String);

/// Grepable error code and retryable flag for structured `error` events.
pub trait ErrorCode: fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// SHAPE MODEL
// =============================================================================

/// A point in canvas coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
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

/// An 8-bit RGB color. Travels as a `#rrggbb` string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ColorError(s.to_owned());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).map_err(|_| invalid());
        Ok(Self { r: channel(0..2)?, g: channel(2..4)?, b: channel(4..6)? })
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A room participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub color: Rgb,
}

/// The drawing primitive a shape represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Freehand,
    Line,
    Rectangle,
    Ellipse,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Freehand => "freehand",
            Self::Line => "line",
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
        })
    }
}

/// Geometry of a shape, tagged by its kind.
///
/// On the wire the tag travels as `kind` and the fields as `geometry`, both
/// flattened into the enclosing [`Shape`] object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "geometry", rename_all = "lowercase")]
pub enum Geometry {
    /// Ordered stroke points. Append-only while the stroke is being drawn.
    Freehand { points: Vec<Point> },
    Line { start: Point, end: Point },
    Rectangle { start: Point, end: Point },
    Ellipse { start: Point, end: Point },
}

impl Geometry {
    /// Build the two-point geometry for a bounded kind, or a single-point
    /// stroke for freehand.
    #[must_use]
    pub fn from_points(kind: ShapeKind, start: Point, end: Point) -> Self {
        match kind {
            ShapeKind::Freehand => Self::Freehand { points: vec![start] },
            ShapeKind::Line => Self::Line { start, end },
            ShapeKind::Rectangle => Self::Rectangle { start, end },
            ShapeKind::Ellipse => Self::Ellipse { start, end },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Freehand { .. } => ShapeKind::Freehand,
            Self::Line { .. } => ShapeKind::Line,
            Self::Rectangle { .. } => ShapeKind::Rectangle,
            Self::Ellipse { .. } => ShapeKind::Ellipse,
        }
    }
}

/// Stroke styling shared by every kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub stroke_color: Rgb,
    pub stroke_width: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self { stroke_color: Rgb::WHITE, stroke_width: 2.0 }
    }
}

/// One drawing primitive as stored in a room's shape log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: ShapeId,
    #[serde(flatten)]
    pub geometry: Geometry,
    pub style: Style,
    pub owner_id: UserId,
}

impl Shape {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Identity a client presents when creating or joining a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_color: Rgb,
}

impl RoomRequest {
    /// The member record this request asks the room to admit.
    #[must_use]
    pub fn user(&self) -> User {
        User { id: self.user_id.clone(), display_name: self.user_name.clone(), color: self.user_color }
    }
}

/// Events a client sends to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    CreateRoom(RoomRequest),
    JoinRoom(RoomRequest),
    /// Append a new shape, or amend the entry with the same id.
    DrawShape { room_id: RoomId, shape: Shape },
    /// Amend an existing shape by id. Ignored when the id is unknown.
    UpdateShape { room_id: RoomId, shape: Shape },
    ClearCanvas { room_id: RoomId },
}

impl ClientEvent {
    /// Room the event targets.
    #[must_use]
    pub fn room_id(&self) -> &str {
        match self {
            Self::CreateRoom(req) | Self::JoinRoom(req) => &req.room_id,
            Self::DrawShape { room_id, .. } | Self::UpdateShape { room_id, .. } | Self::ClearCanvas { room_id } => {
                room_id
            }
        }
    }

    /// Event name as it appears on the wire, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "createRoom",
            Self::JoinRoom(_) => "joinRoom",
            Self::DrawShape { .. } => "drawShape",
            Self::UpdateShape { .. } => "updateShape",
            Self::ClearCanvas { .. } => "clearCanvas",
        }
    }
}

/// Events the relay sends to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Membership snapshot sent to a client that created or joined a room.
    RoomJoined { room_id: RoomId, users: Vec<User> },
    /// Full shape log snapshot sent on join.
    InitialShapes(Vec<Shape>),
    UserJoined { user: User, users: Vec<User> },
    UserLeft { user_id: UserId, users: Vec<User> },
    DrawShape(Shape),
    UpdateShape(Shape),
    ClearCanvas,
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Build a structured error event from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error { code: err.error_code().to_owned(), message: err.to_string() }
    }

    /// Event name as it appears on the wire, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomJoined { .. } => "roomJoined",
            Self::InitialShapes(_) => "initialShapes",
            Self::UserJoined { .. } => "userJoined",
            Self::UserLeft { .. } => "userLeft",
            Self::DrawShape(_) => "drawShape",
            Self::UpdateShape(_) => "updateShape",
            Self::ClearCanvas => "clearCanvas",
            Self::Error { .. } => "error",
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode an event into a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails. None of the event
/// types in this crate produce such a failure in practice.
pub fn encode<E: Serialize>(event: &E) -> Result<String, CodecError> {
    Ok(serde_json::to_string(event)?)
}

/// Decode a JSON text frame into an event.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed JSON, unknown event names,
/// unknown shape kinds, and missing or mistyped fields.
pub fn decode<E: DeserializeOwned>(text: &str) -> Result<E, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
