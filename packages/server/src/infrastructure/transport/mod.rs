//! [`Transport`](crate::domain::Transport) implementations
//!
//! - `websocket`: axum WebSocket connections
//! - `memory`: in-process channels, for embedding and tests

pub mod memory;
pub mod websocket;

pub use memory::{MemoryFrame, MemoryPeer, MemoryReader, MemoryTransport, memory_transport};
pub use websocket::WebSocketTransport;
