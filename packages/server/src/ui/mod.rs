//! HTTP surface: WebSocket upgrade endpoints and read-only API.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use signal::shutdown_signal;
