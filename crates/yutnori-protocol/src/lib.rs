//! Wire protocol for the Yutnori server.
//!
//! This crate defines the language clients and server speak:
//!
//! - **Framing** ([`Frame`], [`read_frame`], [`write_frame`]) — the
//!   `[kind u8][len u16 BE][payload]` envelope every message travels in.
//! - **Messages** ([`MessageKind`], [`ClientRequest`], [`ServerEvent`]) —
//!   the kinds on the wire and their JSON payload shapes.
//! - **Identities** ([`ClientId`], [`RoomId`]) — the opaque ids the
//!   server mints for connections and rooms.
//!
//! The protocol layer sits between the raw TCP stream and the hub/room
//! layers. It knows how to turn bytes into requests and events into
//! bytes; it has no idea what a room or a turn is.

mod error;
mod frame;
mod message;
mod types;

pub use error::ProtocolError;
pub use frame::{read_frame, write_frame, Frame, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use message::{ClientRequest, MessageKind, Move, ServerEvent};
pub use types::{ClientId, PlayerEntry, Recipient, RoomId, ID_LEN};
