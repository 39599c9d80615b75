//! Cloneable front door to the hub loop.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::domain::{Connection, ConnectionId};

use super::{
    command::{HubCommand, RoomSummary},
    error::HubError,
};

/// Submits requests to the hub.
///
/// All requests share one FIFO queue, so requests from a single submitter are
/// processed in the order they were made. The hub stops once every handle is
/// dropped or [`HubHandle::shutdown`] is called.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    server_ip: Arc<str>,
    mailbox_slots: usize,
}

impl HubHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<HubCommand>,
        server_ip: Arc<str>,
        mailbox_slots: usize,
    ) -> Self {
        Self {
            commands,
            server_ip,
            mailbox_slots,
        }
    }

    /// Add `connection` to the membership and announce it to its room
    pub async fn admit(&self, connection: Connection) -> Result<(), HubError> {
        self.submit(HubCommand::Admit(connection)).await
    }

    /// Remove a member, close its mailbox and announce the departure.
    ///
    /// Retiring a connection that is not a member does nothing.
    pub async fn retire(&self, id: ConnectionId) -> Result<(), HubError> {
        self.submit(HubCommand::Retire(id)).await
    }

    /// Deliver raw envelope bytes to every member of the envelope's room.
    ///
    /// Envelopes whose `sender` is not a current member are dropped.
    pub async fn route(&self, raw: Vec<u8>) -> Result<(), HubError> {
        self.submit(HubCommand::Route(raw)).await
    }

    /// Current membership grouped by room.
    ///
    /// Answered after every request submitted before it has been processed.
    pub async fn snapshot(&self) -> Result<Vec<RoomSummary>, HubError> {
        let (reply, response) = oneshot::channel();
        self.submit(HubCommand::Snapshot(reply)).await?;
        response.await.map_err(|_| HubError::Closed)
    }

    /// Close every mailbox and stop the hub loop
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.submit(HubCommand::Shutdown).await
    }

    /// Address stamped as `server_ip` on envelopes
    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    /// Capacity new mailboxes should be created with
    pub fn mailbox_slots(&self) -> usize {
        self.mailbox_slots
    }

    async fn submit(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::Closed)
    }
}
