//! The world synchronization protocol: wire messages, snapshot chunking and
//! reassembly, and the per-connection phase state machine.
//!
//! A connection proceeds as follows:
//!
//! 1. The client sends [`ClientMessage::Hello`].
//! 2. The server replies with [`ServerMessage::Welcome`], then streams the whole world as
//!    zero or more [`ServerMessage::WorldChunk`]s followed by exactly one
//!    [`ServerMessage::WorldComplete`].
//! 3. The server sends incremental updates ([`ServerMessage::BlockChanged`],
//!    [`ServerMessage::EntityMoved`], [`ServerMessage::EntityRemoved`]) in the order the
//!    changes were made, interleaved with replies to the client's requests.
//!
//! If the connection falls too far behind, step 2 is repeated (without a new welcome)
//! before incremental updates resume.

mod message;
pub use message::*;
mod phase;
pub use phase::*;
mod snapshot;
pub use snapshot::*;
