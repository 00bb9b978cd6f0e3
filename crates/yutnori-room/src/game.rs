//! The per-room game instance and its state machine.
//!
//! [`GameInstance`] holds everything game-related a room owns: the
//! seated players with their pieces, the roll pool, whose turn it is,
//! and the current phase. Mutating methods return the events the room
//! should deliver rather than sending anything themselves, which keeps
//! the rules testable without a single socket.

use std::collections::HashSet;

use rand::Rng;
use yutnori_board::{move_sequence, Cell, Piece};
use yutnori_protocol::{ClientId, Move, Recipient, ServerEvent};

use crate::{MAX_PIECE_COUNT, MIN_PIECE_COUNT, MIN_PLAYER_COUNT};

/// Events to deliver after a game mutation, in order.
pub(crate) type Outcome = Vec<(Recipient, ServerEvent)>;

/// Phase of the room's game.
///
/// Only a few phases are ever at rest (`GameEnded`, `CanRoll`,
/// `SelectingMove`, `BeginMove`); the others are passed through within
/// a single mailbox command but are part of the protocol's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    GameEnded,
    GameStarted,
    BeginTurn,
    EndTurn,
    CanRoll,
    BeginRoll,
    EndRoll,
    BeginMove,
    EndMove,
    SelectingMove,
}

/// One seated player.
#[derive(Debug, Clone)]
pub struct Player {
    pub client_id: ClientId,
    pub name: String,
    pub is_ready: bool,
    /// All piece slots; only `piece_count` of them are active in a game.
    pub pieces: [Piece; MAX_PIECE_COUNT as usize],
}

impl Player {
    pub fn new(client_id: ClientId, name: String) -> Self {
        Self {
            client_id,
            name,
            is_ready: false,
            pieces: [Piece::home(); MAX_PIECE_COUNT as usize],
        }
    }
}

/// All game-relevant data for one room.
///
/// Owned by the room actor; nothing outside its mailbox loop reads or
/// writes any of these fields.
#[derive(Debug)]
pub struct GameInstance {
    pub players: Vec<Player>,
    pub piece_count: u8,
    pub state: GameState,
    pub turn_idx: usize,
    /// Unconsumed roll values for the turn player, in roll order.
    pub rolls: Vec<i8>,
    /// Members that have reported their move animation finished.
    end_move_acks: HashSet<ClientId>,
    current_move: Move,
    current_move_finishes: bool,
}

impl GameInstance {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            piece_count: MIN_PIECE_COUNT,
            state: GameState::GameEnded,
            turn_idx: 0,
            rolls: Vec::new(),
            end_move_acks: HashSet::new(),
            current_move: Move {
                roll: 0,
                piece: 0,
                cell: Cell::BottomRight,
            },
            current_move_finishes: false,
        }
    }

    pub fn player_index(&self, client_id: &ClientId) -> Option<usize> {
        self.players.iter().position(|p| &p.client_id == client_id)
    }

    fn turn_player(&self) -> &Player {
        &self.players[self.turn_idx]
    }

    /// The pieces actually in play for `player`.
    fn active_pieces(&self, player_idx: usize) -> &[Piece] {
        &self.players[player_idx].pieces[..usize::from(self.piece_count)]
    }

    /// Sends every piece home, clears ready flags and leftover turn
    /// bookkeeping, and returns the room to the lobby phase.
    pub fn reset(&mut self) {
        self.state = GameState::GameEnded;
        self.rolls.clear();
        self.end_move_acks.clear();
        for player in &mut self.players {
            player.is_ready = false;
            player.pieces = [Piece::home(); MAX_PIECE_COUNT as usize];
        }
    }

    /// Starts a fresh game. The room has already verified that the
    /// initiator is the master.
    pub(crate) fn start(&mut self, initiator: &ClientId, rng: &mut impl Rng) -> Outcome {
        if self.state != GameState::GameEnded
            || self.players.len() < MIN_PLAYER_COUNT
            || !self.players.iter().all(|p| p.is_ready)
        {
            return vec![(
                Recipient::Player(initiator.clone()),
                ServerEvent::start_rejected(),
            )];
        }

        self.reset();
        self.turn_idx = rng.gen_range(0..self.players.len());
        let starter = self.turn_player().client_id.clone();
        self.state = GameState::CanRoll;
        tracing::info!(starting_player = %starter, "game started");
        vec![
            (
                Recipient::All,
                ServerEvent::StartGame {
                    should_start: true,
                    starting_player: starter.clone(),
                },
            ),
            (Recipient::All, ServerEvent::BeginTurn),
            (
                Recipient::Player(starter.clone()),
                ServerEvent::CanRoll { player: starter },
            ),
        ]
    }

    /// Draws one stick throw from the weighted distribution:
    /// back-do and nak 10% each, 1..3 steps 20% each, yut and mo 10%.
    fn draw_roll(rng: &mut impl Rng) -> i8 {
        match rng.gen_range(0..100u32) {
            0..=9 => -1,
            10..=19 => 0,
            20..=39 => 1,
            40..=59 => 2,
            60..=79 => 3,
            80..=89 => 4,
            _ => 5,
        }
    }

    /// Folds a rolled value into the pool. Returns whether it was kept:
    /// a 0 wipes the pool instead, and a -1 is discarded when the turn
    /// player has nothing on the board and nothing else to spend.
    fn apply_roll(&mut self, roll: i8) -> bool {
        if roll == 0 {
            self.rolls.clear();
            return false;
        }
        let all_at_start = self
            .active_pieces(self.turn_idx)
            .iter()
            .all(|p| p.at_start);
        if roll == -1 && all_at_start && self.rolls.is_empty() {
            return false;
        }
        self.rolls.push(roll);
        true
    }

    /// Handles a `BeginRoll` from `client_id`.
    pub(crate) fn begin_roll(&mut self, client_id: &ClientId, rng: &mut impl Rng) -> Outcome {
        if self.state != GameState::CanRoll {
            tracing::debug!(%client_id, state = ?self.state, "roll outside roll phase, ignoring");
            return Vec::new();
        }
        if &self.turn_player().client_id != client_id {
            tracing::debug!(%client_id, "roll from non-turn player, ignoring");
            return Vec::new();
        }
        let roll = Self::draw_roll(rng);
        self.resolve_roll(client_id, roll)
    }

    /// Applies a known roll value and advances the phase.
    fn resolve_roll(&mut self, client_id: &ClientId, roll: i8) -> Outcome {
        let should_append = self.apply_roll(roll);
        let mut events = vec![(
            Recipient::All,
            ServerEvent::EndRoll {
                should_append,
                roll,
            },
        )];
        if roll == 4 || roll == 5 {
            // Yut and mo grant another throw.
            let player = client_id.clone();
            self.state = GameState::CanRoll;
            events.push((
                Recipient::Player(player.clone()),
                ServerEvent::CanRoll { player },
            ));
        } else if self.rolls.is_empty() {
            events.extend(self.advance_turn());
        } else {
            let player = client_id.clone();
            self.state = GameState::SelectingMove;
            events.push((
                Recipient::Player(player.clone()),
                ServerEvent::SelectingMove { player },
            ));
        }
        events
    }

    /// Passes the turn to the next player and calls for their roll.
    fn advance_turn(&mut self) -> Outcome {
        self.turn_idx = (self.turn_idx + 1) % self.players.len();
        let next = self.turn_player().client_id.clone();
        self.state = GameState::CanRoll;
        vec![
            (
                Recipient::All,
                ServerEvent::EndTurn {
                    next_player: next.clone(),
                },
            ),
            (Recipient::All, ServerEvent::BeginTurn),
            (
                Recipient::Player(next.clone()),
                ServerEvent::CanRoll { player: next },
            ),
        ]
    }

    /// Handles a `BeginMove` from `client_id`.
    ///
    /// Legal iff the room is selecting a move, the sender drives the
    /// turn, the piece index is active and unfinished, the roll is in
    /// the pool, and the target cell terminates one of the piece's
    /// paths. An illegal request answers only the sender and changes
    /// nothing.
    pub(crate) fn begin_move(&mut self, client_id: &ClientId, mv: Move) -> Outcome {
        let rejected = || {
            vec![(
                Recipient::Player(client_id.clone()),
                ServerEvent::move_rejected(),
            )]
        };
        if self.state != GameState::SelectingMove
            || &self.turn_player().client_id != client_id
            || mv.piece >= self.piece_count
        {
            return rejected();
        }
        let piece = self.turn_player().pieces[usize::from(mv.piece)];
        if piece.finished {
            return rejected();
        }
        let Some(roll_idx) = self.rolls.iter().position(|&r| r == mv.roll) else {
            return rejected();
        };
        let seq = move_sequence(piece, mv.roll);
        if !seq.lands_on(mv.cell) {
            return rejected();
        }

        self.rolls.remove(roll_idx);
        self.end_move_acks.clear();
        self.current_move = mv;
        self.current_move_finishes = seq.finishes;
        self.state = GameState::BeginMove;
        vec![(
            Recipient::All,
            ServerEvent::BeginMove {
                player: client_id.clone(),
                should_move: true,
                roll: mv.roll,
                cell: mv.cell,
                piece: mv.piece,
                finished: seq.finishes,
            },
        )]
    }

    /// Records one member's animation-complete ack. The move is applied
    /// only once every current member has acked the same move.
    pub(crate) fn end_move(&mut self, client_id: &ClientId, mv: Move) -> Outcome {
        if self.state != GameState::BeginMove {
            tracing::debug!(%client_id, state = ?self.state, "ack outside move phase, ignoring");
            return Vec::new();
        }
        if self.player_index(client_id).is_none() || mv != self.current_move {
            tracing::debug!(%client_id, "stray move ack, ignoring");
            return Vec::new();
        }
        self.end_move_acks.insert(client_id.clone());
        if self.end_move_acks.len() != self.players.len() {
            return Vec::new();
        }
        self.apply_current_move()
    }

    fn apply_current_move(&mut self) -> Outcome {
        let mv = self.current_move;
        let target = mv.cell;
        let finishes = self.current_move_finishes;
        let count = usize::from(self.piece_count);
        let turn_idx = self.turn_idx;

        // Carry set: a piece entering from start moves alone; a piece
        // already on the board takes every live boardmate on its cell
        // along with it.
        let mover = self.players[turn_idx].pieces[usize::from(mv.piece)];
        let pieces = &mut self.players[turn_idx].pieces;
        if mover.at_start {
            pieces[usize::from(mv.piece)] = Piece {
                at_start: false,
                finished: finishes,
                cell: target,
            };
        } else {
            for piece in pieces[..count].iter_mut() {
                if !piece.finished && !piece.at_start && piece.cell == mover.cell {
                    piece.cell = target;
                    piece.finished = finishes;
                }
            }
        }

        // Stomp: opponent pieces standing on the target go home.
        let mut stomped = false;
        for (idx, player) in self.players.iter_mut().enumerate() {
            if idx == turn_idx {
                continue;
            }
            for piece in player.pieces[..count].iter_mut() {
                if !piece.finished && !piece.at_start && piece.cell == target {
                    *piece = Piece::home();
                    stomped = true;
                }
            }
        }

        let current = self.players[turn_idx].client_id.clone();
        if self.active_pieces(turn_idx).iter().all(|p| p.finished) {
            self.state = GameState::GameEnded;
            tracing::info!(winner = %current, "game over");
            return vec![(Recipient::All, ServerEvent::EndGame { winner: current })];
        }
        if stomped {
            // Sending an opponent home earns another throw.
            self.state = GameState::CanRoll;
            return vec![(
                Recipient::Player(current.clone()),
                ServerEvent::CanRoll { player: current },
            )];
        }
        if self.rolls.is_empty() {
            return self.advance_turn();
        }
        self.state = GameState::SelectingMove;
        vec![(
            Recipient::Player(current.clone()),
            ServerEvent::SelectingMove { player: current },
        )]
    }
}

impl Default for GameInstance {
    fn default() -> Self {
        Self::new()
    }
}
