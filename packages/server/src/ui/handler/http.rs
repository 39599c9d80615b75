//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::ui::state::AppState;
use hiroba_shared::time::millis_to_rfc3339;

#[derive(Debug, Serialize)]
pub struct RoomSummaryDto {
    pub room: String,
    pub member_count: usize,
    pub members: Vec<MemberDto>,
}

#[derive(Debug, Serialize)]
pub struct MemberDto {
    pub id: String,
    /// RFC 3339
    pub connected_at: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Rooms with at least one member
pub async fn get_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomSummaryDto>>, StatusCode> {
    let rooms = state.hub.snapshot().await.map_err(|e| {
        tracing::error!("Failed to read rooms: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    // Domain Model から DTO への変換
    let rooms = rooms
        .into_iter()
        .map(|room| RoomSummaryDto {
            room: room.room,
            member_count: room.members.len(),
            members: room
                .members
                .into_iter()
                .map(|member| MemberDto {
                    id: member.id,
                    connected_at: millis_to_rfc3339(member.admitted_at),
                })
                .collect(),
        })
        .collect();

    Ok(Json(rooms))
}
