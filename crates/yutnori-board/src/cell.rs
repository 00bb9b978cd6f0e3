//! The 29 board cells and the single-step movement rules between them.

use serde::{Deserialize, Serialize};

/// Errors produced when interpreting raw cell values.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The wire carried an ordinal outside the board.
    #[error("no cell with ordinal {0}")]
    InvalidCell(u8),
}

/// A position on the Yutnori board.
///
/// `BottomRight` is both the starting cell and the finish gateway:
/// pieces enter the board from it and finish by crossing it again.
/// The two diagonals cut across the square; their entry points are
/// `TopRight` (anti-diagonal) and `TopLeft` (main diagonal).
///
/// On the wire a cell is its ordinal, so the discriminants below are
/// part of the protocol and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Cell {
    BottomRight = 0,
    Right0 = 1,
    Right1 = 2,
    Right2 = 3,
    Right3 = 4,
    TopRight = 5,
    Top0 = 6,
    Top1 = 7,
    Top2 = 8,
    Top3 = 9,
    TopLeft = 10,
    Left0 = 11,
    Left1 = 12,
    Left2 = 13,
    Left3 = 14,
    BottomLeft = 15,
    Bottom0 = 16,
    Bottom1 = 17,
    Bottom2 = 18,
    Bottom3 = 19,
    MainDiagonal0 = 20,
    MainDiagonal1 = 21,
    MainDiagonal2 = 22,
    MainDiagonal3 = 23,
    AntiDiagonal0 = 24,
    AntiDiagonal1 = 25,
    AntiDiagonal2 = 26,
    AntiDiagonal3 = 27,
    Center = 28,
}

impl Cell {
    /// Every cell, in ordinal order.
    pub const ALL: [Cell; 29] = [
        Cell::BottomRight,
        Cell::Right0,
        Cell::Right1,
        Cell::Right2,
        Cell::Right3,
        Cell::TopRight,
        Cell::Top0,
        Cell::Top1,
        Cell::Top2,
        Cell::Top3,
        Cell::TopLeft,
        Cell::Left0,
        Cell::Left1,
        Cell::Left2,
        Cell::Left3,
        Cell::BottomLeft,
        Cell::Bottom0,
        Cell::Bottom1,
        Cell::Bottom2,
        Cell::Bottom3,
        Cell::MainDiagonal0,
        Cell::MainDiagonal1,
        Cell::MainDiagonal2,
        Cell::MainDiagonal3,
        Cell::AntiDiagonal0,
        Cell::AntiDiagonal1,
        Cell::AntiDiagonal2,
        Cell::AntiDiagonal3,
        Cell::Center,
    ];
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> u8 {
        cell as u8
    }
}

impl TryFrom<u8> for Cell {
    type Error = BoardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Cell::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(BoardError::InvalidCell(value))
    }
}

/// The default forward step from `cell`.
///
/// `at_start` matters only at `BottomRight`: a piece that has not yet
/// entered the board steps onto `Right0`, while a piece coming back
/// around has crossed the finish line. Landing on a shortcut corner
/// (`TopRight`, `TopLeft`) routes the next step onto the diagonal, and
/// a piece sitting on `Center` continues down the main diagonal.
///
/// Returns the next cell and whether the step finishes the piece.
pub fn next_cell(cell: Cell, at_start: bool) -> (Cell, bool) {
    use Cell::*;
    match cell {
        BottomRight if at_start => (Right0, false),
        BottomRight => (BottomRight, true),
        Right0 => (Right1, false),
        Right1 => (Right2, false),
        Right2 => (Right3, false),
        Right3 => (TopRight, false),
        TopRight => (AntiDiagonal0, false),
        Top0 => (Top1, false),
        Top1 => (Top2, false),
        Top2 => (Top3, false),
        Top3 => (TopLeft, false),
        TopLeft => (MainDiagonal0, false),
        Left0 => (Left1, false),
        Left1 => (Left2, false),
        Left2 => (Left3, false),
        Left3 => (BottomLeft, false),
        BottomLeft => (Bottom0, false),
        Bottom0 => (Bottom1, false),
        Bottom1 => (Bottom2, false),
        Bottom2 => (Bottom3, false),
        Bottom3 => (BottomRight, false),
        MainDiagonal0 => (MainDiagonal1, false),
        MainDiagonal1 => (Center, false),
        MainDiagonal2 => (MainDiagonal3, false),
        MainDiagonal3 => (BottomRight, false),
        AntiDiagonal0 => (AntiDiagonal1, false),
        AntiDiagonal1 => (Center, false),
        AntiDiagonal2 => (AntiDiagonal3, false),
        AntiDiagonal3 => (BottomLeft, false),
        Center => (MainDiagonal2, false),
    }
}

/// The step taken while passing *through* `cell` mid-move.
///
/// Differs from [`next_cell`] in three places: passing over
/// `BottomRight` always finishes, passing a shortcut corner stays on
/// the outer ring, and passing `Center` continues on whichever
/// diagonal `prev` arrived from.
pub fn next_passing_cell(prev: Cell, cell: Cell) -> (Cell, bool) {
    use Cell::*;
    match cell {
        BottomRight => (BottomRight, true),
        Right0 => (Right1, false),
        Right1 => (Right2, false),
        Right2 => (Right3, false),
        Right3 => (TopRight, false),
        TopRight => (Top0, false),
        Top0 => (Top1, false),
        Top1 => (Top2, false),
        Top2 => (Top3, false),
        Top3 => (TopLeft, false),
        TopLeft => (Left0, false),
        Left0 => (Left1, false),
        Left1 => (Left2, false),
        Left2 => (Left3, false),
        Left3 => (BottomLeft, false),
        BottomLeft => (Bottom0, false),
        Bottom0 => (Bottom1, false),
        Bottom1 => (Bottom2, false),
        Bottom2 => (Bottom3, false),
        Bottom3 => (BottomRight, false),
        MainDiagonal0 => (MainDiagonal1, false),
        MainDiagonal1 => (Center, false),
        MainDiagonal2 => (MainDiagonal3, false),
        MainDiagonal3 => (BottomRight, false),
        AntiDiagonal0 => (AntiDiagonal1, false),
        AntiDiagonal1 => (Center, false),
        AntiDiagonal2 => (AntiDiagonal3, false),
        AntiDiagonal3 => (BottomLeft, false),
        Center if prev == AntiDiagonal1 => (AntiDiagonal2, false),
        Center => (MainDiagonal2, false),
    }
}

/// The one or two cells a back-up move (roll of -1) can land on.
///
/// Two distinct predecessors exist only where paths merge: at
/// `BottomRight` (outer ring or main diagonal), `BottomLeft` (outer
/// ring or anti-diagonal), and `Center` (either diagonal). Everywhere
/// else the same cell is returned twice.
pub fn prev_cell(cell: Cell) -> (Cell, Cell) {
    use Cell::*;
    match cell {
        BottomRight => (Bottom3, MainDiagonal3),
        Right0 => (BottomRight, BottomRight),
        Right1 => (Right0, Right0),
        Right2 => (Right1, Right1),
        Right3 => (Right2, Right2),
        TopRight => (Right3, Right3),
        Top0 => (TopRight, TopRight),
        Top1 => (Top0, Top0),
        Top2 => (Top1, Top1),
        Top3 => (Top2, Top2),
        TopLeft => (Top3, Top3),
        Left0 => (TopLeft, TopLeft),
        Left1 => (Left0, Left0),
        Left2 => (Left1, Left1),
        Left3 => (Left2, Left2),
        BottomLeft => (Left3, AntiDiagonal3),
        Bottom0 => (BottomLeft, BottomLeft),
        Bottom1 => (Bottom0, Bottom0),
        Bottom2 => (Bottom1, Bottom1),
        Bottom3 => (Bottom2, Bottom2),
        MainDiagonal0 => (TopLeft, TopLeft),
        MainDiagonal1 => (MainDiagonal0, MainDiagonal0),
        MainDiagonal2 => (Center, Center),
        MainDiagonal3 => (MainDiagonal2, MainDiagonal2),
        AntiDiagonal0 => (TopRight, TopRight),
        AntiDiagonal1 => (AntiDiagonal0, AntiDiagonal0),
        AntiDiagonal2 => (Center, Center),
        AntiDiagonal3 => (AntiDiagonal2, AntiDiagonal2),
        Center => (MainDiagonal1, AntiDiagonal1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_stable() {
        assert_eq!(u8::from(Cell::BottomRight), 0);
        assert_eq!(u8::from(Cell::TopRight), 5);
        assert_eq!(u8::from(Cell::TopLeft), 10);
        assert_eq!(u8::from(Cell::BottomLeft), 15);
        assert_eq!(u8::from(Cell::MainDiagonal0), 20);
        assert_eq!(u8::from(Cell::AntiDiagonal0), 24);
        assert_eq!(u8::from(Cell::Center), 28);
    }

    #[test]
    fn ordinal_round_trip() {
        for cell in Cell::ALL {
            assert_eq!(Cell::try_from(u8::from(cell)).unwrap(), cell);
        }
    }

    #[test]
    fn out_of_range_ordinal_is_rejected() {
        assert!(Cell::try_from(29).is_err());
        assert!(Cell::try_from(255).is_err());
    }

    #[test]
    fn cell_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Cell::Right2).unwrap(), "3");
        let cell: Cell = serde_json::from_str("28").unwrap();
        assert_eq!(cell, Cell::Center);
        assert!(serde_json::from_str::<Cell>("29").is_err());
    }

    #[test]
    fn start_cell_depends_on_at_start_flag() {
        assert_eq!(next_cell(Cell::BottomRight, true), (Cell::Right0, false));
        assert_eq!(next_cell(Cell::BottomRight, false), (Cell::BottomRight, true));
    }

    #[test]
    fn landing_on_shortcut_corners_enters_the_diagonals() {
        assert_eq!(next_cell(Cell::TopRight, false), (Cell::AntiDiagonal0, false));
        assert_eq!(next_cell(Cell::TopLeft, false), (Cell::MainDiagonal0, false));
    }

    #[test]
    fn passing_shortcut_corners_stays_on_the_ring() {
        assert_eq!(next_passing_cell(Cell::Right3, Cell::TopRight), (Cell::Top0, false));
        assert_eq!(next_passing_cell(Cell::Top3, Cell::TopLeft), (Cell::Left0, false));
    }

    #[test]
    fn passing_center_follows_the_arriving_diagonal() {
        assert_eq!(
            next_passing_cell(Cell::MainDiagonal1, Cell::Center),
            (Cell::MainDiagonal2, false)
        );
        assert_eq!(
            next_passing_cell(Cell::AntiDiagonal1, Cell::Center),
            (Cell::AntiDiagonal2, false)
        );
    }

    #[test]
    fn landing_on_center_then_stepping_takes_the_main_diagonal() {
        assert_eq!(next_cell(Cell::Center, false), (Cell::MainDiagonal2, false));
    }

    #[test]
    fn passing_the_finish_gateway_finishes() {
        assert_eq!(next_passing_cell(Cell::Bottom3, Cell::BottomRight), (Cell::BottomRight, true));
        assert_eq!(
            next_passing_cell(Cell::MainDiagonal3, Cell::BottomRight),
            (Cell::BottomRight, true)
        );
    }

    #[test]
    fn merge_points_have_two_predecessors() {
        assert_eq!(prev_cell(Cell::BottomRight), (Cell::Bottom3, Cell::MainDiagonal3));
        assert_eq!(prev_cell(Cell::BottomLeft), (Cell::Left3, Cell::AntiDiagonal3));
        assert_eq!(prev_cell(Cell::Center), (Cell::MainDiagonal1, Cell::AntiDiagonal1));
    }

    #[test]
    fn other_cells_have_one_predecessor() {
        for cell in Cell::ALL {
            if matches!(cell, Cell::BottomRight | Cell::BottomLeft | Cell::Center) {
                continue;
            }
            let (a, b) = prev_cell(cell);
            assert_eq!(a, b, "{cell:?} should have a single predecessor");
        }
    }

    // Walking forward from a cell's predecessor reaches the cell again,
    // either as a fresh step or while passing through.
    #[test]
    fn prev_then_next_round_trips() {
        for cell in Cell::ALL {
            if cell == Cell::BottomRight {
                continue;
            }
            let (prev, _) = prev_cell(cell);
            let (via_landing, _) = next_cell(prev, false);
            let (before_prev, _) = prev_cell(prev);
            let (via_passing, _) = next_passing_cell(before_prev, prev);
            assert!(
                via_landing == cell || via_passing == cell,
                "{prev:?} does not step back to {cell:?}"
            );
        }
    }
}
