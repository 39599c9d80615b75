//! Shared state of the HTTP handlers.

use tokio_util::task::TaskTracker;

use crate::hub::HubHandle;

pub struct AppState {
    pub hub: HubHandle,
    /// Upgraded connections; they outlive the HTTP request that created them
    pub connections: TaskTracker,
}
