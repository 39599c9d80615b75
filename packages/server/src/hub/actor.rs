//! The hub loop.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};

use hiroba_shared::time::Clock;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use crate::domain::{Connection, ConnectionId, Envelope, MailboxItem};

use super::{
    command::{HubCommand, MemberSummary, RoomSummary},
    config::{ANNOUNCEMENT_HEADROOM, HubConfig, OverflowPolicy},
    handle::HubHandle,
};

/// What is being fanned out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// Routed client message; may not use the announcement headroom
    Message,
    /// Join or leave notice from the hub itself
    Announcement,
}

impl Delivery {
    fn reserved_slots(self) -> usize {
        match self {
            Self::Message => ANNOUNCEMENT_HEADROOM,
            Self::Announcement => 0,
        }
    }
}

struct Member {
    connection: Connection,
    admitted_at: i64,
}

/// Owner of the membership map. Only reachable through a [`HubHandle`].
pub struct Hub {
    members: HashMap<ConnectionId, Member>,
    config: HubConfig,
    clock: Arc<dyn Clock>,
}

impl Hub {
    /// Start the hub loop on the current tokio runtime
    pub fn spawn(config: HubConfig, clock: Arc<dyn Clock>) -> (HubHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity.max(1));
        let handle = HubHandle::new(
            commands_tx,
            Arc::from(config.server_ip.as_str()),
            config.mailbox_slots(),
        );

        let hub = Self {
            members: HashMap::new(),
            config,
            clock,
        };
        let task = tokio::spawn(hub.run(commands_rx));

        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        tracing::info!(
            "Hub started (overflow policy: {:?}, echo to sender: {})",
            self.config.overflow_policy,
            self.config.echo_to_sender
        );

        while let Some(command) = commands.recv().await {
            match command {
                HubCommand::Admit(connection) => self.admit(connection).await,
                HubCommand::Retire(id) => self.retire(vec![id]).await,
                HubCommand::Route(raw) => self.route(raw).await,
                HubCommand::Snapshot(reply) => {
                    // requester may have given up waiting
                    let _ = reply.send(self.snapshot());
                }
                HubCommand::Shutdown => break,
            }
        }

        let remaining = self.members.len();
        // dropping the members closes every mailbox
        self.members.clear();
        tracing::info!("Hub stopped, closed {} remaining connection(s)", remaining);
    }

    async fn admit(&mut self, connection: Connection) {
        if self.members.contains_key(&connection.id) {
            tracing::warn!(
                "Connection '{}' is already a member, ignoring admission",
                connection.id
            );
            return;
        }

        let id = connection.id.clone();
        let room = connection.room.clone();
        let joined = Envelope::joined(&id, &room, &self.config.server_ip, &connection.sender_addr);

        self.members.insert(
            id.clone(),
            Member {
                connection,
                admitted_at: self.clock.now_millis(),
            },
        );
        tracing::info!("Client '{}' connected in room '{}'", id, room);

        match joined.encode() {
            Ok(raw) => {
                let undeliverable = self
                    .fan_out(
                        room.as_str(),
                        raw.into(),
                        Some(id.as_str()),
                        Delivery::Announcement,
                    )
                    .await;
                self.retire(undeliverable).await;
            }
            Err(e) => tracing::error!("Failed to encode joined announcement: {}", e),
        }
    }

    /// Retire members one at a time. Announcing a departure can reveal
    /// further closed mailboxes; those members are queued behind the current
    /// ones.
    async fn retire(&mut self, ids: Vec<ConnectionId>) {
        let mut pending = VecDeque::from(ids);

        while let Some(id) = pending.pop_front() {
            let Some(member) = self.members.remove(&id) else {
                tracing::debug!("Connection '{}' is not a member, nothing to retire", id);
                continue;
            };

            let connection = member.connection;
            let room = connection.room.clone();
            let left = Envelope::left(
                &connection.id,
                &room,
                &self.config.server_ip,
                &connection.sender_addr,
            );
            // closes the mailbox and stops the connection's pump
            drop(connection);
            tracing::info!("Client '{}' disconnected from room '{}'", id, room);

            match left.encode() {
                Ok(raw) => {
                    let undeliverable = self
                        .fan_out(room.as_str(), raw.into(), None, Delivery::Announcement)
                        .await;
                    pending.extend(undeliverable);
                }
                Err(e) => tracing::error!("Failed to encode left announcement: {}", e),
            }
        }
    }

    async fn route(&mut self, raw: Vec<u8>) {
        let envelope = Envelope::decode_lenient(&raw);
        let Some(room) = envelope.target_room() else {
            tracing::debug!("Dropping envelope without a room ({} bytes)", raw.len());
            return;
        };

        let Some(sender) = envelope.sender.as_deref() else {
            tracing::debug!("Dropping envelope without a sender for room '{}'", room);
            return;
        };
        if !self.is_member(sender) {
            tracing::debug!("Dropping envelope from '{}', not a member", sender);
            return;
        }

        let skip = if self.config.echo_to_sender {
            None
        } else {
            Some(sender)
        };

        tracing::debug!("Routing envelope from '{}' to room '{}'", sender, room);
        let undeliverable = self
            .fan_out(room, raw.into(), skip, Delivery::Message)
            .await;
        self.retire(undeliverable).await;
    }

    fn is_member(&self, id: &str) -> bool {
        self.members.keys().any(|member| member.as_str() == id)
    }

    /// Enqueue `item` on every member of `room` except `skip`.
    ///
    /// Returns the members to retire: closed mailboxes, and under
    /// [`OverflowPolicy::Disconnect`] full ones for client messages.
    async fn fan_out(
        &self,
        room: &str,
        item: MailboxItem,
        skip: Option<&str>,
        delivery: Delivery,
    ) -> Vec<ConnectionId> {
        let mut undeliverable = Vec::new();

        for (id, member) in &self.members {
            if member.connection.room.as_str() != room || skip == Some(id.as_str()) {
                continue;
            }

            let mailbox = &member.connection.mailbox;
            let keep = match self.config.overflow_policy {
                OverflowPolicy::Block => mailbox.send(item.clone()).await.is_ok(),
                OverflowPolicy::Disconnect => {
                    let offered = if mailbox.is_closed() {
                        Err(TrySendError::Closed(item.clone()))
                    } else if mailbox.capacity() <= delivery.reserved_slots() {
                        Err(TrySendError::Full(item.clone()))
                    } else {
                        mailbox.try_send(item.clone())
                    };

                    match (offered, delivery) {
                        (Ok(()), _) => true,
                        (Err(TrySendError::Closed(_)), _) => false,
                        (Err(TrySendError::Full(_)), Delivery::Message) => {
                            tracing::warn!("Mailbox of '{}' is full, disconnecting it", id);
                            false
                        }
                        (Err(TrySendError::Full(_)), Delivery::Announcement) => {
                            tracing::warn!("Mailbox of '{}' is full, dropping announcement", id);
                            true
                        }
                    }
                }
            };

            if !keep {
                undeliverable.push(id.clone());
            }
        }

        undeliverable
    }

    fn snapshot(&self) -> Vec<RoomSummary> {
        let mut rooms: BTreeMap<&str, Vec<MemberSummary>> = BTreeMap::new();
        for (id, member) in &self.members {
            rooms
                .entry(member.connection.room.as_str())
                .or_default()
                .push(MemberSummary {
                    id: id.as_str().to_string(),
                    admitted_at: member.admitted_at,
                });
        }

        rooms
            .into_iter()
            .map(|(room, mut members)| {
                members.sort_by(|a, b| a.id.cmp(&b.id));
                RoomSummary {
                    room: room.to_string(),
                    members,
                }
            })
            .collect()
    }
}
