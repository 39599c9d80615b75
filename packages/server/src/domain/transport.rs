//! The duplex transport seam.
//!
//! A transport is split once into a reading half, owned by the inbound loop,
//! and a writing half, owned by the outbound loop. No other component touches
//! either half.

use async_trait::async_trait;

use super::error::TransportError;

/// A live, already-upgraded duplex message transport
pub trait Transport: Send + 'static {
    type Reader: FrameReader;
    type Writer: FrameWriter;

    fn split(self) -> (Self::Reader, Self::Writer);
}

#[async_trait]
pub trait FrameReader: Send + 'static {
    /// Wait for the next discrete message from the peer.
    ///
    /// Control frames are handled by the implementation; a close from the peer
    /// surfaces as [`TransportError::Closed`].
    async fn read_frame(&mut self) -> Result<String, TransportError>;
}

#[async_trait]
pub trait FrameWriter: Send + 'static {
    /// Write one discrete text message
    async fn write_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Write a close/terminate frame
    async fn write_close(&mut self) -> Result<(), TransportError>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<(), TransportError>;
}
