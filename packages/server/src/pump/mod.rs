//! Connection pump: the inbound/outbound task pair bridging one transport to
//! the hub.
//!
//! ```text
//! transport ──read──▶ inbound loop ──route/retire──▶ hub
//! hub ──mailbox──▶ outbound loop ──write──▶ transport
//! ```
//!
//! The inbound loop owns the reading half of the transport, the outbound
//! loop owns the writing half and the mailbox receiver. The connection goes
//! `created → registered → routing → unregistering → closed` and never back.
//!
//! Either side can end the connection. A failed read makes the inbound loop
//! ask the hub to retire it. When the hub lets go of the connection for any
//! reason (retirement, overflow, shutdown) its retired token is cancelled:
//! the inbound loop stops reading at once and the outbound loop finishes the
//! mailbox, giving up on writes that stall past a grace period.

mod inbound;
mod outbound;

use tokio::task::JoinHandle;

use crate::{
    domain::{Connection, ConnectionId, RoomId, Transport, mailbox},
    hub::{HubError, HubHandle},
};

/// Entry point for a freshly upgraded transport
pub struct ConnectionPump;

impl ConnectionPump {
    /// Register a new connection with the hub and start both loops.
    ///
    /// # Arguments
    ///
    /// * `hub` - Hub the connection joins
    /// * `transport` - Live duplex transport, exclusively owned from here on
    /// * `room` - Room fixed for the connection's lifetime
    /// * `sender_addr` - Remote address of the client
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the hub is no longer running. The
    /// transport is dropped in that case.
    pub async fn start<T: Transport>(
        hub: &HubHandle,
        transport: T,
        room: RoomId,
        sender_addr: String,
    ) -> Result<PumpHandle, HubError> {
        let id = ConnectionId::generate();
        let (mailbox_tx, mailbox_rx) = mailbox(hub.mailbox_slots());

        let connection = Connection::new(
            id.clone(),
            room.clone(),
            sender_addr.clone(),
            mailbox_tx,
        );
        let retired = connection.retired();
        hub.admit(connection).await?;

        let (reader, writer) = transport.split();
        let outbound = tokio::spawn(outbound::run(
            writer,
            mailbox_rx,
            id.clone(),
            retired.clone(),
        ));
        let inbound = tokio::spawn(inbound::run(
            reader,
            hub.clone(),
            id.clone(),
            room,
            sender_addr,
            retired,
        ));

        Ok(PumpHandle {
            id,
            inbound,
            outbound,
        })
    }
}

/// Running pump of one connection
#[derive(Debug)]
pub struct PumpHandle {
    id: ConnectionId,
    inbound: JoinHandle<()>,
    outbound: JoinHandle<()>,
}

impl PumpHandle {
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Wait until both loops have terminated
    pub async fn join(self) {
        if let Err(e) = self.inbound.await {
            tracing::error!("Inbound loop of '{}' panicked: {}", self.id, e);
        }
        if let Err(e) = self.outbound.await {
            tracing::error!("Outbound loop of '{}' panicked: {}", self.id, e);
        }
    }
}
