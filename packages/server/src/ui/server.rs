//! Server execution logic.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

use crate::hub::HubHandle;

use super::{
    handler::{get_rooms, health_check, websocket_handler, websocket_room_handler},
    state::AppState,
};

/// How long shutdown waits for open connections to send their close frames
const CONNECTION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket relay server
///
/// # Example
///
/// ```ignore
/// let (hub, _hub_task) = Hub::spawn(HubConfig::default(), Arc::new(SystemClock));
/// Server::new(hub).run("127.0.0.1", 8080, shutdown_signal()).await?;
/// ```
pub struct Server {
    hub: HubHandle,
    connections: TaskTracker,
}

impl Server {
    pub fn new(hub: HubHandle) -> Self {
        Self {
            hub,
            connections: TaskTracker::new(),
        }
    }

    /// Routes of the relay
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            hub: self.hub.clone(),
            connections: self.connections.clone(),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            .route("/ws/{room}", get(websocket_room_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Bind to `host:port` and serve until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(
        self,
        host: &str,
        port: u16,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws?room=<name>", bind_addr);

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Once the HTTP server has stopped, the hub is shut down and the open
    /// WebSocket connections are given time to send their close frames.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("WebSocket relay listening on {}", listener.local_addr()?);

        let app = self.router();
        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        self.close_connections().await;
        served?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Upgraded connections are detached from the HTTP server, so they are
    /// closed through the hub and awaited here
    async fn close_connections(&self) {
        if self.hub.shutdown().await.is_err() {
            tracing::debug!("Hub already stopped");
        }

        self.connections.close();
        tracing::info!("Closing {} open connection(s)", self.connections.len());
        if tokio::time::timeout(CONNECTION_DRAIN_TIMEOUT, self.connections.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                "{} connection(s) still open after {:?}",
                self.connections.len(),
                CONNECTION_DRAIN_TIMEOUT
            );
        }
    }
}
