//! An admitted client and its outbound mailbox.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::value_object::{ConnectionId, RoomId};

/// One queued delivery: the raw envelope bytes, shared by every recipient of
/// the same fan-out.
pub type MailboxItem = Arc<[u8]>;

/// Sending half of a mailbox. Owned by the hub while the connection is a
/// member; dropping it closes the mailbox.
pub type Mailbox = mpsc::Sender<MailboxItem>;

/// Receiving half of a mailbox, owned by the connection's outbound loop
pub type MailboxReceiver = mpsc::Receiver<MailboxItem>;

/// Create a bounded mailbox.
///
/// A capacity of zero is raised to one.
pub fn mailbox(capacity: usize) -> (Mailbox, MailboxReceiver) {
    mpsc::channel(capacity.max(1))
}

/// A client as the hub sees it.
///
/// Dropping the connection closes its mailbox and cancels the token handed out
/// by [`Connection::retired`], so both loops of the pump learn that the hub
/// let go of it.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    /// Fixed at creation
    pub room: RoomId,
    /// Address of the remote client, stamped on envelopes as `sender_ip`
    pub sender_addr: String,
    pub mailbox: Mailbox,
    retired: CancellationToken,
}

impl Connection {
    pub fn new(id: ConnectionId, room: RoomId, sender_addr: String, mailbox: Mailbox) -> Self {
        Self {
            id,
            room,
            sender_addr,
            mailbox,
            retired: CancellationToken::new(),
        }
    }

    /// Token cancelled once the connection is dropped by whoever holds it
    pub fn retired(&self) -> CancellationToken {
        self.retired.clone()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.retired.cancel();
    }
}
