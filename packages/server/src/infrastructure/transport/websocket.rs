//! Transport over an upgraded axum WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};

use crate::domain::{FrameReader, FrameWriter, Transport, TransportError};

pub struct WebSocketTransport {
    socket: WebSocket,
}

impl WebSocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl Transport for WebSocketTransport {
    type Reader = WebSocketReader;
    type Writer = WebSocketWriter;

    fn split(self) -> (Self::Reader, Self::Writer) {
        let (sink, stream) = self.socket.split();
        (WebSocketReader { stream }, WebSocketWriter { sink })
    }
}

pub struct WebSocketReader {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl FrameReader for WebSocketReader {
    async fn read_frame(&mut self) -> Result<String, TransportError> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Ok(text.to_string()),
                Ok(Message::Binary(data)) => {
                    return Ok(String::from_utf8_lossy(&data).into_owned());
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                    tracing::trace!("Received ping/pong");
                }
                Ok(Message::Close(_)) => return Err(TransportError::Closed),
                Err(e) => return Err(TransportError::Read(e.to_string())),
            }
        }

        Err(TransportError::Closed)
    }
}

pub struct WebSocketWriter {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameWriter for WebSocketWriter {
    async fn write_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn write_close(&mut self) -> Result<(), TransportError> {
        self.sink
            .send(Message::Close(None))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::close(&mut self.sink)
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}
