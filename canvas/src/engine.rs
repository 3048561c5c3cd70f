use frames::{ClientEvent, Point, RoomId, RoomRequest, ServerEvent, Shape, User};
use uuid::Uuid;

use crate::doc::{Applied, Replica};
use crate::history::History;
use crate::input::{Gesture, InputState, Tool, UiState};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from engine calls for the host to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Transmit this event to the relay.
    Send(ClientEvent),
    /// The replica or preview changed; repaint.
    RenderNeeded,
    /// The relay reported an error, e.g. joining a room that does not exist.
    Error { code: String, message: String },
}

/// Room the engine is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub room_id: RoomId,
    /// Membership from the latest `roomJoined`/`userJoined`/`userLeft`.
    pub members: Vec<User>,
    /// Set once the relay confirmed the create/join.
    pub joined: bool,
}

/// Client engine: replica, gesture state machine, and local history.
///
/// Inbound server events and local pointer input may interleave freely; both
/// go through the same amend-or-append rule on the replica.
pub struct EngineCore {
    pub doc: Replica,
    pub ui: UiState,
    pub input: InputState,
    history: History,
    user: User,
    session: Option<Session>,
}

impl EngineCore {
    /// Create an engine drawing on behalf of `user`.
    #[must_use]
    pub fn new(user: User) -> Self {
        Self::with_history(user, History::default())
    }

    #[must_use]
    pub fn with_history(user: User, history: History) -> Self {
        Self { doc: Replica::new(), ui: UiState::default(), input: InputState::Idle, history, user, session: None }
    }

    // --- Session ---

    /// Start a new room. Local state is reset to an empty canvas.
    pub fn create_room(&mut self, room_id: impl Into<RoomId>) -> Vec<Action> {
        let req = self.enter_room(room_id.into());
        vec![Action::Send(ClientEvent::CreateRoom(req)), Action::RenderNeeded]
    }

    /// Join an existing room. The replica is replaced when `initialShapes` arrives.
    pub fn join_room(&mut self, room_id: impl Into<RoomId>) -> Vec<Action> {
        let req = self.enter_room(room_id.into());
        vec![Action::Send(ClientEvent::JoinRoom(req)), Action::RenderNeeded]
    }

    fn enter_room(&mut self, room_id: RoomId) -> RoomRequest {
        self.input = InputState::Idle;
        self.doc.clear();
        self.history.reset();
        self.session = Some(Session { room_id: room_id.clone(), members: Vec::new(), joined: false });
        RoomRequest {
            room_id,
            user_id: self.user.id.clone(),
            user_name: self.user.display_name.clone(),
            user_color: self.user.color,
        }
    }

    // --- Data inputs ---

    /// Apply one event received from the relay.
    pub fn apply_server_event(&mut self, event: ServerEvent) -> Vec<Action> {
        match event {
            ServerEvent::RoomJoined { room_id, users } => {
                self.session = Some(Session { room_id, members: users, joined: true });
                vec![Action::RenderNeeded]
            }
            ServerEvent::InitialShapes(shapes) => {
                self.doc.load_snapshot(shapes);
                vec![Action::RenderNeeded]
            }
            ServerEvent::UserJoined { users, .. } | ServerEvent::UserLeft { users, .. } => {
                if let Some(session) = self.session.as_mut() {
                    session.members = users;
                }
                vec![Action::RenderNeeded]
            }
            ServerEvent::DrawShape(shape) | ServerEvent::UpdateShape(shape) => {
                self.doc.upsert(shape);
                vec![Action::RenderNeeded]
            }
            ServerEvent::ClearCanvas => {
                self.doc.clear();
                vec![Action::RenderNeeded]
            }
            ServerEvent::Error { code, message } => {
                // A refused create/join leaves us outside any room.
                if self.session.as_ref().is_some_and(|s| !s.joined) {
                    self.session = None;
                }
                vec![Action::Error { code, message }]
            }
        }
    }

    // --- Tool / style ---

    pub fn set_tool(&mut self, tool: Tool) {
        self.ui.tool = tool;
    }

    pub fn set_stroke_color(&mut self, color: frames::Rgb) {
        self.ui.style.stroke_color = color;
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        self.ui.style.stroke_width = width;
    }

    // --- Pointer input ---

    /// Begin a gesture. Freehand strokes are committed and transmitted at once
    /// so peers see the stroke start.
    pub fn on_pointer_down(&mut self, point: Point) -> Vec<Action> {
        if !self.input.is_idle() {
            return Vec::new();
        }
        let gesture = Gesture::begin(Uuid::new_v4().to_string(), self.ui.tool, self.ui.style, point);
        let seeded = if gesture.tool.is_bounded() { None } else { gesture.shape(&self.user.id) };
        self.input = InputState::Drawing(gesture);

        let mut actions = Vec::new();
        if let Some(shape) = seeded {
            self.commit(shape.clone());
            actions.extend(self.outbound(|room_id| ClientEvent::DrawShape { room_id, shape }));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Extend the active gesture. Only freehand strokes produce traffic here.
    pub fn on_pointer_move(&mut self, point: Point) -> Vec<Action> {
        let InputState::Drawing(gesture) = &mut self.input else {
            return Vec::new();
        };
        gesture.advance(point);
        if gesture.tool.is_bounded() {
            return vec![Action::RenderNeeded];
        }
        let Some(shape) = gesture.shape(&self.user.id) else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        let applied = self.doc.upsert(shape.clone());
        actions.extend(self.outbound(|room_id| match applied {
            Applied::Amended => ClientEvent::UpdateShape { room_id, shape },
            // The stroke vanished locally (remote clear); re-create it everywhere.
            Applied::Appended => ClientEvent::DrawShape { room_id, shape },
        }));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Finish the active gesture. Bounded shapes are committed here with the
    /// last known end point; a bounded gesture that never moved commits nothing.
    pub fn on_pointer_up(&mut self) -> Vec<Action> {
        let InputState::Drawing(gesture) = std::mem::take(&mut self.input) else {
            return Vec::new();
        };
        if !gesture.tool.is_bounded() {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if let Some(shape) = gesture.shape(&self.user.id) {
            self.commit(shape.clone());
            actions.extend(self.outbound(|room_id| ClientEvent::DrawShape { room_id, shape }));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- History ---

    /// Restore the previous local snapshot. Never transmitted.
    pub fn undo(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        let Some(previous) = self.history.undo(self.doc.snapshot()) else {
            return Vec::new();
        };
        self.doc.restore(previous);
        vec![Action::RenderNeeded]
    }

    /// Reapply the most recently undone snapshot. Never transmitted.
    pub fn redo(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        let Some(next) = self.history.redo(self.doc.snapshot()) else {
            return Vec::new();
        };
        self.doc.restore(next);
        vec![Action::RenderNeeded]
    }

    /// Empty the canvas for everyone in the room.
    pub fn clear(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        let before = self.doc.restore(Vec::new());
        self.history.record(before);

        let mut actions: Vec<Action> = self.outbound(|room_id| ClientEvent::ClearCanvas { room_id }).into_iter().collect();
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Queries ---

    /// Committed shapes in log order.
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        self.doc.shapes()
    }

    /// Uncommitted bounded shape to draw on top of the replica, if any.
    #[must_use]
    pub fn preview(&self) -> Option<Shape> {
        match &self.input {
            InputState::Drawing(gesture) if gesture.tool.is_bounded() => gesture.shape(&self.user.id),
            _ => None,
        }
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.room_id.as_str())
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Helpers ---

    /// Optimistically apply a new commit: snapshot for undo, then upsert.
    fn commit(&mut self, shape: Shape) {
        self.history.record(self.doc.snapshot());
        self.doc.upsert(shape);
    }

    /// Wrap an event for the current room. Offline edits stay local.
    fn outbound(&self, build: impl FnOnce(RoomId) -> ClientEvent) -> Option<Action> {
        let session = self.session.as_ref()?;
        Some(Action::Send(build(session.room_id.clone())))
    }
}
