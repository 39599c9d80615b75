//! Hub configuration.

/// Mailbox slots kept free of client messages under
/// [`OverflowPolicy::Disconnect`], so join and leave announcements issued in
/// the same hub turn as a message still fit.
pub const ANNOUNCEMENT_HEADROOM: usize = 8;

/// What the hub does when a recipient's mailbox has no free capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Wait until the recipient makes room. Stalls the whole hub meanwhile.
    Block,
    /// Retire the recipient of a client message after the current fan-out.
    /// Announcements that do not fit are dropped for that recipient.
    #[default]
    Disconnect,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Client messages each connection's mailbox may hold
    pub mailbox_capacity: usize,
    /// Capacity of the hub's command queue
    pub command_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Deliver a routed message back to the connection that sent it
    pub echo_to_sender: bool,
    /// Address stamped as `server_ip` on every envelope
    pub server_ip: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
            command_capacity: 1024,
            overflow_policy: OverflowPolicy::default(),
            echo_to_sender: true,
            server_ip: "localhost".to_string(),
        }
    }
}

impl HubConfig {
    /// Slots to create each mailbox with
    pub fn mailbox_slots(&self) -> usize {
        let capacity = self.mailbox_capacity.max(1);
        match self.overflow_policy {
            OverflowPolicy::Block => capacity,
            OverflowPolicy::Disconnect => capacity + ANNOUNCEMENT_HEADROOM,
        }
    }
}
