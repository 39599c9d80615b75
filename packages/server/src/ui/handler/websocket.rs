//! WebSocket upgrade handlers.
//!
//! The room comes either from the query (`/ws?room=lobby`) or from the path
//! (`/ws/lobby`). The upgraded socket is handed to a connection pump.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    extract::{
        ConnectInfo, Path, Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    domain::RoomId,
    hub::HubHandle,
    infrastructure::transport::WebSocketTransport,
    pump::ConnectionPump,
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub room: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<ConnectQuery>,
) -> Response {
    upgrade(ws, &state, addr, query.room)
}

pub async fn websocket_room_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(room): Path<String>,
) -> Response {
    upgrade(ws, &state, addr, Some(room))
}

fn upgrade(
    ws: WebSocketUpgrade,
    state: &AppState,
    addr: SocketAddr,
    room: Option<String>,
) -> Response {
    let Some(Ok(room)) = room.map(RoomId::new) else {
        tracing::warn!("Rejecting connection from {} without a room", addr);
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "room is required"})),
        )
            .into_response();
    };

    let hub = state.hub.clone();
    let connections = state.connections.clone();
    ws.on_upgrade(move |socket| {
        connections.track_future(handle_socket(socket, hub, room, addr))
    })
}

async fn handle_socket(socket: WebSocket, hub: HubHandle, room: RoomId, addr: SocketAddr) {
    let pump = match ConnectionPump::start(
        &hub,
        WebSocketTransport::new(socket),
        room.clone(),
        addr.to_string(),
    )
    .await
    {
        Ok(pump) => pump,
        Err(e) => {
            tracing::error!("Cannot register connection from {}: {}", addr, e);
            return;
        }
    };

    let id = pump.id().clone();
    tracing::info!("Connection '{}' from {} joined room '{}'", id, addr, room);
    pump.join().await;
    tracing::info!("Connection '{}' closed", id);
}
