//! Read-only room status endpoints.

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::services::registry::{RoomDetail, RoomSummary};
use crate::state::AppState;

/// `GET /api/rooms`: one row per live room.
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    let registry = state.registry.lock().await;
    Json(registry.summaries())
}

/// `GET /api/rooms/{id}`: members and shape log of one live room.
pub async fn get_room(State(state): State<AppState>, Path(room_id): Path<String>) -> Result<Json<RoomDetail>, StatusCode> {
    let registry = state.registry.lock().await;
    registry.detail(&room_id).map(Json).ok_or(StatusCode::NOT_FOUND)
}
