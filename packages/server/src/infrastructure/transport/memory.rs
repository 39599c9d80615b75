//! In-process transport backed by unbounded channels.
//!
//! [`memory_transport`] returns the server side, handed to a
//! [`ConnectionPump`](crate::pump::ConnectionPump), and a [`MemoryPeer`]
//! that plays the client.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{FrameReader, FrameWriter, Transport, TransportError};

/// Frame written by the server side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryFrame {
    Text(String),
    Close,
}

type Inbound = Result<String, TransportError>;

pub fn memory_transport() -> (MemoryTransport, MemoryPeer) {
    let (to_server, from_peer) = mpsc::unbounded_channel();
    let (to_peer, from_server) = mpsc::unbounded_channel();

    (
        MemoryTransport { from_peer, to_peer },
        MemoryPeer {
            to_server,
            from_server,
        },
    )
}

pub struct MemoryTransport {
    from_peer: mpsc::UnboundedReceiver<Inbound>,
    to_peer: mpsc::UnboundedSender<MemoryFrame>,
}

impl Transport for MemoryTransport {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn split(self) -> (Self::Reader, Self::Writer) {
        (
            MemoryReader {
                from_peer: self.from_peer,
            },
            MemoryWriter {
                to_peer: Some(self.to_peer),
            },
        )
    }
}

pub struct MemoryReader {
    from_peer: mpsc::UnboundedReceiver<Inbound>,
}

#[async_trait]
impl FrameReader for MemoryReader {
    async fn read_frame(&mut self) -> Result<String, TransportError> {
        // a dropped peer is a closed connection
        self.from_peer
            .recv()
            .await
            .unwrap_or(Err(TransportError::Closed))
    }
}

pub struct MemoryWriter {
    /// `None` once closed
    to_peer: Option<mpsc::UnboundedSender<MemoryFrame>>,
}

impl MemoryWriter {
    fn push(&self, frame: MemoryFrame) -> Result<(), TransportError> {
        let to_peer = self.to_peer.as_ref().ok_or(TransportError::Closed)?;
        to_peer
            .send(frame)
            .map_err(|_| TransportError::Write("peer is gone".to_string()))
    }
}

#[async_trait]
impl FrameWriter for MemoryWriter {
    async fn write_text(&mut self, text: String) -> Result<(), TransportError> {
        self.push(MemoryFrame::Text(text))
    }

    async fn write_close(&mut self) -> Result<(), TransportError> {
        self.push(MemoryFrame::Close)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.to_peer = None;
        Ok(())
    }
}

/// Client end of a memory transport
#[derive(Debug)]
pub struct MemoryPeer {
    to_server: mpsc::UnboundedSender<Inbound>,
    from_server: mpsc::UnboundedReceiver<MemoryFrame>,
}

impl MemoryPeer {
    /// Send a text frame to the server. Returns `false` if the server side
    /// stopped reading.
    pub fn send(&self, text: &str) -> bool {
        self.to_server.send(Ok(text.to_string())).is_ok()
    }

    /// Make the server's next read fail with `error`
    pub fn fail(&self, error: TransportError) -> bool {
        self.to_server.send(Err(error)).is_ok()
    }

    /// Next frame written by the server; `None` once the server side closed
    pub async fn recv(&mut self) -> Option<MemoryFrame> {
        self.from_server.recv().await
    }
}
