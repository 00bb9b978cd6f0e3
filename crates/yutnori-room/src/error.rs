//! Error types for the room layer.

use yutnori_protocol::RoomId;

/// Errors that can occur when talking to a room actor.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room's mailbox is closed — the actor has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
