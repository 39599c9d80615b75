//! Room-scoped WebSocket relay.
//!
//! Clients connect to a room and receive every message sent into it. A single
//! [`hub::Hub`] task owns the membership and performs every fan-out; each
//! connection is served by a [`pump::ConnectionPump`] made of an inbound and
//! an outbound task.

// layers
pub mod domain;
pub mod hub;
pub mod infrastructure;
pub mod pump;
pub mod ui;
