//! Deriving the cells a piece may land on for a given roll.

use crate::cell::{next_cell, next_passing_cell, prev_cell, Cell};

/// A single piece on (or off) the board.
///
/// Invariants: a finished piece is never at start, and a piece at
/// start sits on [`Cell::BottomRight`] without occupying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub at_start: bool,
    pub finished: bool,
    pub cell: Cell,
}

impl Piece {
    /// A piece waiting to enter the board.
    pub fn home() -> Self {
        Self {
            at_start: true,
            finished: false,
            cell: Cell::BottomRight,
        }
    }

    /// A live piece standing on `cell`.
    pub fn on_board(cell: Cell) -> Self {
        Self {
            at_start: false,
            finished: false,
            cell,
        }
    }
}

impl Default for Piece {
    fn default() -> Self {
        Self::home()
    }
}

/// The cells traversed by one candidate move.
///
/// Positive rolls produce a single path in `first`. A back-up roll can
/// offer two single-cell paths when the piece stands on a merge point;
/// `second` is empty otherwise. The terminal cell of each non-empty
/// path is a legal landing target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveSequence {
    pub first: Vec<Cell>,
    pub second: Vec<Cell>,
    pub finishes: bool,
}

impl MoveSequence {
    /// Whether `cell` is the terminal cell of a non-empty path.
    pub fn lands_on(&self, cell: Cell) -> bool {
        self.first.last() == Some(&cell) || self.second.last() == Some(&cell)
    }

    /// Whether the roll offers no move at all (backing up from start).
    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }
}

/// Computes the path(s) available to `piece` for `roll`.
///
/// `roll` is a pool value: -1 or 1..=5, never 0. A -1 yields the
/// predecessor cell(s) of the piece's position, or nothing if the
/// piece has not entered the board. A positive roll takes one landing
/// step from the piece's cell and then `roll - 1` passing steps,
/// stopping early when a step crosses the finish line.
pub fn move_sequence(piece: Piece, roll: i8) -> MoveSequence {
    if roll == -1 {
        if piece.at_start {
            return MoveSequence::default();
        }
        let (back_a, back_b) = prev_cell(piece.cell);
        let mut seq = MoveSequence {
            first: vec![back_a],
            ..MoveSequence::default()
        };
        if back_b != back_a {
            seq.second.push(back_b);
        }
        return seq;
    }

    let mut prev = piece.cell;
    let (mut current, finished) = next_cell(piece.cell, piece.at_start);
    let mut first = vec![current];
    if finished {
        return MoveSequence {
            first,
            second: Vec::new(),
            finishes: true,
        };
    }
    for _ in 1..roll {
        let (next, finished) = next_passing_cell(prev, current);
        prev = current;
        current = next;
        first.push(next);
        if finished {
            return MoveSequence {
                first,
                second: Vec::new(),
                finishes: true,
            };
        }
    }
    MoveSequence {
        first,
        second: Vec::new(),
        finishes: false,
    }
}
