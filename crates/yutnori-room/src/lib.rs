//! Room lifecycle and game rules for the Yutnori server.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! member list, the master, and the game instance. Everything the
//! outside world does to a room goes through its command mailbox, so
//! all game state observations are totally ordered without locks.

mod error;
mod game;
mod room;

pub use error::RoomError;
pub use game::{GameInstance, GameState, Player};
pub use room::{spawn_room, MemberHandle, MemberNotice, RoomHandle, OUTBOUND_QUEUE};

/// Room capacity.
pub const MAX_PLAYER_COUNT: usize = 6;

/// Members required before a game may start.
pub const MIN_PLAYER_COUNT: usize = 2;

/// Most pieces a player can field.
pub const MAX_PIECE_COUNT: u8 = 6;

/// Fewest pieces a player can field.
pub const MIN_PIECE_COUNT: u8 = 2;
