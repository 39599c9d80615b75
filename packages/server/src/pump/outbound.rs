//! Outbound loop: mailbox → transport.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::{
    ClientView, ConnectionId, Envelope, FrameWriter, MailboxReceiver, TransportError,
};

/// How long a single write may still take once the connection is retired
pub(super) const RETIRED_WRITE_GRACE: Duration = Duration::from_secs(1);

/// Write every mailbox item as a client-facing frame until the hub closes the
/// mailbox, then close the transport.
///
/// Write failures do not stop the loop. The mailbox keeps being drained so
/// the hub never waits on a dead socket; the inbound loop's read failure is
/// what retires the connection. A write that is still pending
/// [`RETIRED_WRITE_GRACE`] after retirement is abandoned together with the
/// transport.
pub(super) async fn run<W: FrameWriter>(
    mut writer: W,
    mut mailbox: MailboxReceiver,
    id: ConnectionId,
    retired: CancellationToken,
) {
    while let Some(item) = mailbox.recv().await {
        let view = ClientView::from(Envelope::decode_lenient(&item));
        let text = match serde_json::to_string(&view) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to render message for '{}': {}", id, e);
                continue;
            }
        };

        match within_grace(writer.write_text(text), &retired).await {
            Some(Ok(())) => tracing::debug!("Sent message to '{}'", id),
            Some(Err(e)) => tracing::debug!("Write to '{}' failed: {}", id, e),
            None => {
                tracing::warn!("Write to retired '{}' stalled, dropping the transport", id);
                return;
            }
        }
    }

    match within_grace(writer.write_close(), &retired).await {
        Some(Ok(())) => {}
        Some(Err(e)) => tracing::debug!("Close frame to '{}' not delivered: {}", id, e),
        None => {
            tracing::warn!("Close frame to '{}' stalled, dropping the transport", id);
            return;
        }
    }
    if let Err(e) = writer.close().await {
        tracing::debug!("Closing transport of '{}' failed: {}", id, e);
    }
    tracing::debug!("Outbound loop of '{}' finished", id);
}

/// Run `write`, or give up once `retired` has been cancelled for longer than
/// [`RETIRED_WRITE_GRACE`]
async fn within_grace<F>(
    write: F,
    retired: &CancellationToken,
) -> Option<Result<(), TransportError>>
where
    F: Future<Output = Result<(), TransportError>>,
{
    let deadline = async {
        retired.cancelled().await;
        tokio::time::sleep(RETIRED_WRITE_GRACE).await;
    };

    tokio::select! {
        written = write => Some(written),
        () = deadline => None,
    }
}
