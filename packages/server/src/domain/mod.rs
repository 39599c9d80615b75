//! Domain types of the relay: identifiers, envelopes, connections and the
//! transport seam the connection pumps consume.

pub mod connection;
pub mod envelope;
pub mod error;
pub mod transport;
pub mod value_object;

pub use connection::{Connection, Mailbox, MailboxItem, MailboxReceiver, mailbox};
pub use envelope::{ClientView, Envelope, SERVER_SENDER};
pub use error::{DomainError, EnvelopeError, TransportError};
pub use transport::{FrameReader, FrameWriter, Transport};
pub use value_object::{ConnectionId, RoomId};
