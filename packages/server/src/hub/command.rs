//! Requests drained by the hub loop, and the read-only views it returns.

use serde::Serialize;
use tokio::sync::oneshot;

use crate::domain::{Connection, ConnectionId};

pub(crate) enum HubCommand {
    Admit(Connection),
    Retire(ConnectionId),
    Route(Vec<u8>),
    Snapshot(oneshot::Sender<Vec<RoomSummary>>),
    Shutdown,
}

/// Members of one room at the time of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room: String,
    /// Sorted by id
    pub members: Vec<MemberSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub id: String,
    /// Unix timestamp (milliseconds) of admission
    pub admitted_at: i64,
}
