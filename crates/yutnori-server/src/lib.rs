//! Authoritative multiplayer server for Yutnori.
//!
//! Ties the layers together: the TCP listener hands accepted
//! connections to the hub actor, which mints client identities and
//! owns the room table; each connection runs a reader and a writer
//! task; rooms validate and apply every game action and drive all
//! clients by broadcast.

mod endpoint;
mod error;
mod hub;
mod server;

pub use error::ServerError;
pub use server::Server;
