//! Inbound loop: transport → hub.

use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ConnectionId, Envelope, FrameReader, RoomId, TransportError},
    hub::HubHandle,
};

/// Forward every frame read from the client to the hub until the transport
/// fails or the hub retires the connection.
pub(super) async fn run<R: FrameReader>(
    mut reader: R,
    hub: HubHandle,
    id: ConnectionId,
    room: RoomId,
    sender_addr: String,
    retired: CancellationToken,
) {
    loop {
        let read = tokio::select! {
            () = retired.cancelled() => {
                tracing::info!("Connection '{}' was retired by the hub, stop reading", id);
                break;
            }
            read = reader.read_frame() => read,
        };

        let frame = match read {
            Ok(frame) => frame,
            Err(e) => {
                match e {
                    TransportError::Closed => {
                        tracing::info!("Client '{}' closed the connection", id);
                    }
                    e => tracing::warn!("Reading from '{}' failed: {}", id, e),
                }
                // the hub ignores a retire for a connection it already dropped
                if hub.retire(id.clone()).await.is_err() {
                    tracing::debug!("Hub stopped before '{}' could be retired", id);
                }
                break;
            }
        };

        tracing::debug!("Received message from '{}' in room '{}'", id, room);
        let envelope = Envelope::from_client(&id, &room, &frame, hub.server_ip(), &sender_addr);
        let raw = match envelope.encode() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Dropping message from '{}': {}", id, e);
                continue;
            }
        };

        if hub.route(raw).await.is_err() {
            tracing::warn!("Hub stopped, ending inbound loop of '{}'", id);
            break;
        }
    }

    // releases the reading half; the writing half closes with the outbound loop
    drop(reader);
}
