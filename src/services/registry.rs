//! Session registry: live rooms, their members, and their shape logs.
//!
//! DESIGN
//! ======
//! The registry is the only owner of room state. A room exists exactly while
//! it has at least one member: it is created by the first successful
//! create/join and dropped the moment its last member leaves. Nothing is
//! persisted.
//!
//! Every member record carries that connection's outbound queue, and each
//! mutating operation relays to the other members before returning. Callers
//! hold the registry behind one mutex, so the order peers observe is the
//! order the registry processed events in.
//!
//! Relays are best-effort: `try_send` into a bounded queue, and a full or
//! closed queue loses the event for that member only.
//!
//! MEMBERSHIP
//! ==========
//! Members are keyed by user id. A user who reconnects under the same id
//! replaces their previous record; the stale connection's later `leave` is
//! ignored because it no longer owns the record.

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

use std::collections::HashMap;

use frames::{ErrorCode, RoomId, ServerEvent, Shape, ShapeId, User, UserId};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

/// Identifies one websocket connection for the lifetime of the socket.
pub type ClientId = Uuid;

/// Outbound queue of a connection.
pub type Outbox = mpsc::Sender<ServerEvent>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Room does not exist: {0}")]
    RoomNotFound(RoomId),
    #[error("shape not found: {0}")]
    UnknownShape(ShapeId),
    #[error("connection is not a member of room {0}")]
    NotJoined(RoomId),
}

impl ErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "E_ROOM_NOT_FOUND",
            Self::UnknownShape(_) => "E_UNKNOWN_SHAPE",
            Self::NotJoined(_) => "E_NOT_JOINED",
        }
    }
}

/// A connection's handle as seen by the registry.
#[derive(Debug, Clone)]
pub struct Conn {
    pub client_id: ClientId,
    pub tx: Outbox,
}

struct Member {
    user: User,
    conn: Conn,
}

#[derive(Default)]
struct Room {
    members: HashMap<UserId, Member>,
    shapes: Vec<Shape>,
}

impl Room {
    /// Members ordered by display name, then id.
    fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.members.values().map(|m| m.user.clone()).collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name).then_with(|| a.id.cmp(&b.id)));
        users
    }

    fn has_client(&self, client_id: ClientId) -> bool {
        self.members.values().any(|m| m.conn.client_id == client_id)
    }

    /// Queue `event` for every member except `exclude`.
    fn relay(&self, room_id: &str, event: &ServerEvent, exclude: ClientId) {
        for member in self.members.values() {
            if member.conn.client_id == exclude {
                continue;
            }
            if let Err(e) = member.conn.tx.try_send(event.clone()) {
                debug!(%room_id, client_id = %member.conn.client_id, event = event.name(), error = %e, "relay dropped");
            }
        }
    }
}

/// Status row for one live room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub member_count: usize,
    pub shape_count: usize,
}

/// Full view of one live room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    pub room_id: RoomId,
    pub users: Vec<User>,
    pub shapes: Vec<Shape>,
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Default)]
pub struct Registry {
    rooms: HashMap<RoomId, Room>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `room_id` with `user` as its only member.
    ///
    /// Returns the events for the caller. Creating a room that is already live
    /// joins it instead, so the caller still receives the current log.
    pub fn create_room(&mut self, room_id: &str, user: User, conn: Conn) -> Vec<ServerEvent> {
        if self.rooms.contains_key(room_id) {
            debug!(%room_id, "create on live room; joining");
            return self.admit(room_id, user, conn);
        }

        let mut room = Room::default();
        info!(%room_id, user_id = %user.id, client_id = %conn.client_id, "room created");
        room.members.insert(user.id.clone(), Member { user, conn });
        let users = room.users();
        self.rooms.insert(room_id.to_owned(), room);

        vec![ServerEvent::RoomJoined { room_id: room_id.to_owned(), users }]
    }

    /// Add `user` to an existing room.
    ///
    /// Returns `roomJoined` followed by the log snapshot for the caller, and
    /// relays `userJoined` to everyone else.
    ///
    /// # Errors
    ///
    /// [`RegistryError::RoomNotFound`] when `room_id` is not live.
    pub fn join_room(&mut self, room_id: &str, user: User, conn: Conn) -> Result<Vec<ServerEvent>, RegistryError> {
        if !self.rooms.contains_key(room_id) {
            return Err(RegistryError::RoomNotFound(room_id.to_owned()));
        }
        Ok(self.admit(room_id, user, conn))
    }

    fn admit(&mut self, room_id: &str, user: User, conn: Conn) -> Vec<ServerEvent> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };

        let client_id = conn.client_id;
        if let Some(previous) = room.members.insert(user.id.clone(), Member { user: user.clone(), conn }) {
            if previous.conn.client_id != client_id {
                info!(%room_id, user_id = %user.id, stale_client = %previous.conn.client_id, "member replaced by new connection");
            }
        }
        let users = room.users();
        info!(%room_id, user_id = %user.id, %client_id, members = users.len(), "user joined");

        room.relay(room_id, &ServerEvent::UserJoined { user, users: users.clone() }, client_id);

        vec![
            ServerEvent::RoomJoined { room_id: room_id.to_owned(), users },
            ServerEvent::InitialShapes(room.shapes.clone()),
        ]
    }

    /// Commit a newly drawn shape and relay `drawShape` to the other members.
    ///
    /// A repeated id overwrites the existing entry in place.
    ///
    /// # Errors
    ///
    /// [`RegistryError::RoomNotFound`] or [`RegistryError::NotJoined`].
    pub fn record_shape(&mut self, room_id: &str, shape: Shape, client_id: ClientId) -> Result<(), RegistryError> {
        let room = self.member_room(room_id, client_id)?;

        match room.shapes.iter_mut().find(|s| s.id == shape.id) {
            Some(existing) => *existing = shape.clone(),
            None => room.shapes.push(shape.clone()),
        }
        debug!(%room_id, shape_id = %shape.id, kind = %shape.kind(), count = room.shapes.len(), "shape recorded");

        room.relay(room_id, &ServerEvent::DrawShape(shape), client_id);
        Ok(())
    }

    /// Overwrite an existing shape and relay `updateShape` to the other members.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownShape`] when no entry has `shape.id`; nothing is
    /// relayed in that case. Also [`RegistryError::RoomNotFound`] or
    /// [`RegistryError::NotJoined`].
    pub fn amend_shape(&mut self, room_id: &str, shape: Shape, client_id: ClientId) -> Result<(), RegistryError> {
        let room = self.member_room(room_id, client_id)?;

        let Some(existing) = room.shapes.iter_mut().find(|s| s.id == shape.id) else {
            return Err(RegistryError::UnknownShape(shape.id));
        };
        *existing = shape.clone();

        room.relay(room_id, &ServerEvent::UpdateShape(shape), client_id);
        Ok(())
    }

    /// Truncate the log and relay `clearCanvas` to the other members.
    ///
    /// # Errors
    ///
    /// [`RegistryError::RoomNotFound`] or [`RegistryError::NotJoined`].
    pub fn clear_room(&mut self, room_id: &str, client_id: ClientId) -> Result<(), RegistryError> {
        let room = self.member_room(room_id, client_id)?;
        let dropped = room.shapes.len();
        room.shapes.clear();
        info!(%room_id, %client_id, dropped, "room cleared");

        room.relay(room_id, &ServerEvent::ClearCanvas, client_id);
        Ok(())
    }

    /// Remove `user_id` from the room if `client_id` still owns that member.
    ///
    /// Remaining members get `userLeft`; the room is dropped once empty.
    /// Returns whether a member was removed.
    pub fn leave(&mut self, room_id: &str, user_id: &str, client_id: ClientId) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if room.members.get(user_id).is_none_or(|m| m.conn.client_id != client_id) {
            debug!(%room_id, %user_id, %client_id, "leave ignored; member not owned by connection");
            return false;
        }
        room.members.remove(user_id);

        if room.members.is_empty() {
            self.rooms.remove(room_id);
            info!(%room_id, %user_id, "last member left; room deleted");
            return true;
        }

        let users = room.users();
        info!(%room_id, %user_id, members = users.len(), "user left");
        room.relay(room_id, &ServerEvent::UserLeft { user_id: user_id.to_owned(), users }, client_id);
        true
    }

    // -------------------------------------------------------------------------
    // queries
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Live room ids, sorted.
    #[cfg(test)]
    #[must_use]
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// One status row per live room, sorted by id.
    #[must_use]
    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut rows: Vec<RoomSummary> = self
            .rooms
            .iter()
            .map(|(id, room)| RoomSummary {
                room_id: id.clone(),
                member_count: room.members.len(),
                shape_count: room.shapes.len(),
            })
            .collect();
        rows.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rows
    }

    /// Current log of `room_id`, if live.
    #[cfg(test)]
    #[must_use]
    pub fn snapshot(&self, room_id: &str) -> Option<Vec<Shape>> {
        self.rooms.get(room_id).map(|r| r.shapes.clone())
    }

    /// Members and log of `room_id`, if live.
    #[must_use]
    pub fn detail(&self, room_id: &str) -> Option<RoomDetail> {
        self.rooms.get(room_id).map(|room| RoomDetail {
            room_id: room_id.to_owned(),
            users: room.users(),
            shapes: room.shapes.clone(),
        })
    }

    fn member_room(&mut self, room_id: &str, client_id: ClientId) -> Result<&mut Room, RegistryError> {
        let room = self.rooms.get_mut(room_id).ok_or_else(|| RegistryError::RoomNotFound(room_id.to_owned()))?;
        if !room.has_client(client_id) {
            return Err(RegistryError::NotJoined(room_id.to_owned()));
        }
        Ok(room)
    }
}
