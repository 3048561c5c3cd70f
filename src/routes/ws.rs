//! WebSocket handler for the room event relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client events → decode + dispatch by event name
//! - Events relayed by room peers → forward to client
//!
//! Handler functions validate and call into the registry, which relays to
//! peers itself, and return an `Outcome` describing what goes back to the
//! sender. The socket loop owns all writes to the socket.
//!
//! Each room membership gets its own relay queue. Switching rooms opens a new
//! queue and drops the old one, so nothing still queued from the previous
//! room reaches the client after its new snapshot.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → client id allocated, no room yet
//! 2. `createRoom`/`joinRoom` → snapshot reply, relay queue opened
//! 3. Shape and clear events → registry → peers
//! 4. Close or socket error → implicit leave

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{ClientEvent, RoomId, RoomRequest, ServerEvent, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::registry::{ClientId, Conn, Registry, RegistryError};
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. Peers have already been notified by
/// the registry; this only decides what the sender receives.
#[derive(Debug)]
enum Outcome {
    /// Send these events to the sender, in order.
    Reply(Vec<ServerEvent>),
    /// Applied and relayed; nothing for the sender.
    Relayed,
    /// The event named a room other than the connection's current one.
    Ignored,
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Room and identity a connection is currently a member under.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Membership {
    room_id: RoomId,
    user_id: UserId,
}

/// Per-socket state, owned by the socket task.
struct Connection {
    client_id: ClientId,
    capacity: usize,
    membership: Option<Membership>,
    /// Relay queue opened by the latest room entry, not yet picked up by the loop.
    fresh_rx: Option<mpsc::Receiver<ServerEvent>>,
}

impl Connection {
    fn new(capacity: usize) -> Self {
        Self { client_id: Uuid::new_v4(), capacity: capacity.max(1), membership: None, fresh_rx: None }
    }

    /// Open a new relay queue and return the handle to register with the registry.
    fn open_queue(&mut self) -> Conn {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.fresh_rx = Some(rx);
        Conn { client_id: self.client_id, tx }
    }
}

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let mut conn = Connection::new(state.config.channel_capacity);
    let mut relay_rx: Option<mpsc::Receiver<ServerEvent>> = None;
    let client_id = conn.client_id;

    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&state, &mut conn, text.as_str()).await;
                        if let Some(rx) = conn.fresh_rx.take() {
                            relay_rx = Some(rx);
                        }
                        if send_events(&mut socket, &replies).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    Message::Binary(_) => debug!(%client_id, "ws: binary frame ignored"),
                    _ => {}
                }
            }
            Some(event) = next_relayed(&mut relay_rx) => {
                if send_events(&mut socket, std::slice::from_ref(&event)).await.is_err() {
                    break;
                }
            }
        }
    }

    depart(&state, &mut conn).await;
    info!(%client_id, "ws: client disconnected");
}

async fn next_relayed(rx: &mut Option<mpsc::Receiver<ServerEvent>>) -> Option<ServerEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Implicit leave for whatever room the connection is in.
async fn depart(state: &AppState, conn: &mut Connection) {
    let Some(membership) = conn.membership.take() else {
        return;
    };
    let mut registry = state.registry.lock().await;
    registry.leave(&membership.room_id, &membership.user_id, conn.client_id);
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Decode and process one inbound text frame and return events for the sender.
///
/// Kept apart from the socket so tests can drive dispatch directly.
async fn process_inbound_text(state: &AppState, conn: &mut Connection, text: &str) -> Vec<ServerEvent> {
    let client_id = conn.client_id;
    let event: ClientEvent = match frames::decode(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: malformed inbound event dropped");
            return Vec::new();
        }
    };
    debug!(%client_id, event = event.name(), room_id = event.room_id(), "ws: recv event");

    let result = match event {
        ClientEvent::CreateRoom(req) => handle_enter(state, conn, req, Entry::Create).await,
        ClientEvent::JoinRoom(req) => handle_enter(state, conn, req, Entry::Join).await,
        ClientEvent::DrawShape { room_id, shape } => {
            handle_in_room(state, conn, &room_id, |registry, client_id| registry.record_shape(&room_id, shape, client_id))
                .await
        }
        ClientEvent::UpdateShape { room_id, shape } => {
            handle_in_room(state, conn, &room_id, |registry, client_id| registry.amend_shape(&room_id, shape, client_id))
                .await
        }
        ClientEvent::ClearCanvas { room_id } => {
            handle_in_room(state, conn, &room_id, |registry, client_id| registry.clear_room(&room_id, client_id)).await
        }
    };

    match result {
        Ok(Outcome::Reply(events)) => events,
        Ok(Outcome::Relayed | Outcome::Ignored) => Vec::new(),
        Err(err @ RegistryError::RoomNotFound(_)) => {
            info!(%client_id, error = %err, "ws: request refused");
            vec![ServerEvent::error_from(&err)]
        }
        Err(err) => {
            debug!(%client_id, error = %err, "ws: event not applied");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Create,
    Join,
}

/// Create or join a room, leaving the previous one afterwards.
async fn handle_enter(
    state: &AppState,
    conn: &mut Connection,
    req: RoomRequest,
    entry: Entry,
) -> Result<Outcome, RegistryError> {
    let mut registry = state.registry.lock().await;

    if entry == Entry::Join && !registry.contains(&req.room_id) {
        return Err(RegistryError::RoomNotFound(req.room_id));
    }

    let user = req.user();
    let next = Membership { room_id: req.room_id.clone(), user_id: user.id.clone() };
    let handle = conn.open_queue();
    let replies = match entry {
        Entry::Create => registry.create_room(&req.room_id, user, handle),
        Entry::Join => registry.join_room(&req.room_id, user, handle)?,
    };

    // Admit first: leaving first could empty and delete the very room being re-entered.
    if let Some(previous) = conn.membership.replace(next.clone()) {
        if previous != next {
            registry.leave(&previous.room_id, &previous.user_id, conn.client_id);
        }
    }

    Ok(Outcome::Reply(replies))
}

/// Run `op` against the registry if `room_id` is the connection's current room.
async fn handle_in_room<F>(state: &AppState, conn: &Connection, room_id: &str, op: F) -> Result<Outcome, RegistryError>
where
    F: FnOnce(&mut Registry, ClientId) -> Result<(), RegistryError>,
{
    let Some(membership) = &conn.membership else {
        return Err(RegistryError::NotJoined(room_id.to_owned()));
    };
    if membership.room_id != room_id {
        debug!(client_id = %conn.client_id, %room_id, current = %membership.room_id, "ws: event for other room ignored");
        return Ok(Outcome::Ignored);
    }

    let mut registry = state.registry.lock().await;
    op(&mut registry, conn.client_id)?;
    Ok(Outcome::Relayed)
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_events(socket: &mut WebSocket, events: &[ServerEvent]) -> Result<(), ()> {
    for event in events {
        let json = match frames::encode(event) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, event = event.name(), "ws: failed to encode event");
                return Err(());
            }
        };
        if let Err(e) = socket.send(Message::Text(json.into())).await {
            debug!(error = %e, "ws: send failed");
            return Err(());
        }
    }
    Ok(())
}
