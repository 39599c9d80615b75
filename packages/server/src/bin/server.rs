//! Room-scoped WebSocket relay server.
//!
//! Clients join a room and receive every message broadcast into it.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --no-echo
//! ```

use std::sync::Arc;

use clap::Parser;
use hiroba_server::{
    hub::{Hub, HubConfig, OverflowPolicy},
    infrastructure::network::{SystemInterfaces, resolve_server_ip},
    ui::{Server, shutdown_signal},
};
use hiroba_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Room-scoped WebSocket relay", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Number of undelivered messages each connection may buffer
    #[arg(long, default_value = "256")]
    mailbox_capacity: usize,

    /// Number of pending requests the hub may buffer
    #[arg(long, default_value = "1024")]
    command_capacity: usize,

    /// What to do when a connection's mailbox is full
    #[arg(long, value_enum, default_value_t = OverflowPolicy::Disconnect)]
    overflow_policy: OverflowPolicy,

    /// Do not deliver messages back to their sender
    #[arg(long)]
    no_echo: bool,
}

impl Args {
    fn hub_config(&self, server_ip: String) -> HubConfig {
        HubConfig {
            mailbox_capacity: self.mailbox_capacity,
            command_capacity: self.command_capacity,
            overflow_policy: self.overflow_policy,
            echo_to_sender: !self.no_echo,
            server_ip,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let server_ip = resolve_server_ip(&SystemInterfaces);
    tracing::info!("Stamping envelopes with server address {}", server_ip);

    let (hub, hub_task) = Hub::spawn(args.hub_config(server_ip), Arc::new(SystemClock));

    // the server shuts the hub down once it stops serving
    let result = Server::new(hub)
        .run(&args.host, args.port, shutdown_signal())
        .await;

    if let Err(e) = hub_task.await {
        tracing::error!("Hub task failed: {}", e);
    }

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
