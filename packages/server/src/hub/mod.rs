//! The hub: single serialized authority over room membership and fan-out.
//!
//! The hub runs as one task that owns the membership map outright. Every
//! change to it (admission, retirement) and every fan-out goes through the
//! hub's command queue and is processed to completion before the next
//! command, so no lock guards the membership.
//!
//! ## Head-of-line blocking
//!
//! Fan-out enqueues onto each recipient's bounded mailbox from inside the hub
//! loop. What happens when a mailbox is full is chosen by [`OverflowPolicy`]:
//!
//! - [`OverflowPolicy::Block`] waits for room in the mailbox. One stalled
//!   consumer then stalls admission, retirement and routing for every room.
//! - [`OverflowPolicy::Disconnect`] never waits. The recipient of a client
//!   message is retired once the current fan-out completes. Messages it did
//!   receive keep their order; its stream is cut short.
//!
//! A single hub turn can put several items into one mailbox without the
//! outbound loop getting a chance to run: a routed message followed by a
//! "left" announcement for every member that overflowed on it. Under
//! `Disconnect` each mailbox therefore has [`ANNOUNCEMENT_HEADROOM`] slots on
//! top of `mailbox_capacity` that client messages never use. An announcement
//! only counts against a recipient when even those are taken, and then it is
//! dropped for that recipient instead of retiring it, so one slow member
//! cannot drag healthy neighbours out with it.
//!
//! ## Retirement
//!
//! Removing a member drops its [`Connection`](crate::domain::Connection),
//! which closes the mailbox and cancels the connection's retired token. The
//! pump stops reading on that signal, and the hub refuses envelopes whose
//! sender is no longer a member.
//!
//! Fan-out is a linear scan over all members; rooms are not indexed.

mod actor;
mod command;
mod config;
mod error;
mod handle;

pub use actor::Hub;
pub use command::{MemberSummary, RoomSummary};
pub use config::{ANNOUNCEMENT_HEADROOM, HubConfig, OverflowPolicy};
pub use error::HubError;
pub use handle::HubHandle;
