//! Pure Yutnori board rules.
//!
//! The board is a fixed graph of 29 cells: the outer ring (four corners
//! and four side runs of four) plus two diagonal shortcuts meeting at
//! the center. This crate knows nothing about players, turns, or the
//! network — it only answers "where can this piece go", so both the
//! game state machine and its tests can call it directly.

mod cell;
mod moves;

pub use cell::{next_cell, next_passing_cell, prev_cell, BoardError, Cell};
pub use moves::{move_sequence, MoveSequence, Piece};
