//! Concrete collaborators of the relay core: transports and host network
//! identity.

pub mod network;
pub mod transport;
