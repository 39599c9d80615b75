use thiserror::Error;

/// Errors returned by [`HubHandle`](super::HubHandle) requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub loop has stopped and accepts no more requests
    #[error("hub is not running")]
    Closed,
}
