//! Message kinds and their payload shapes.
//!
//! A single kind enumeration spans both directions. Payloads are JSON
//! objects with snake_case fields; several kinds carry no payload at
//! all. The kind ordinals are wire-stable — never renumber them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use yutnori_board::Cell;

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::types::{ClientId, PlayerEntry, RoomId};

/// Every message kind on the wire, with its stable ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    Keepalive = 0,
    Connect = 1,
    Disconnect = 2,
    /// Reserved; never sent by this server.
    Quit = 3,
    CreateRoom = 4,
    ExitRoom = 5,
    SetPieceCount = 6,
    PlayerLeft = 7,
    EnterRoom = 8,
    PlayerJoined = 9,
    Ready = 10,
    KickPlayer = 11,
    StartGame = 12,
    BeginTurn = 13,
    CanRoll = 14,
    BeginRoll = 15,
    EndRoll = 16,
    EndTurn = 17,
    SelectingMove = 18,
    BeginMove = 19,
    EndMove = 20,
    EndGame = 21,
    ChangeName = 22,
}

impl MessageKind {
    const ALL: [MessageKind; 23] = [
        MessageKind::Keepalive,
        MessageKind::Connect,
        MessageKind::Disconnect,
        MessageKind::Quit,
        MessageKind::CreateRoom,
        MessageKind::ExitRoom,
        MessageKind::SetPieceCount,
        MessageKind::PlayerLeft,
        MessageKind::EnterRoom,
        MessageKind::PlayerJoined,
        MessageKind::Ready,
        MessageKind::KickPlayer,
        MessageKind::StartGame,
        MessageKind::BeginTurn,
        MessageKind::CanRoll,
        MessageKind::BeginRoll,
        MessageKind::EndRoll,
        MessageKind::EndTurn,
        MessageKind::SelectingMove,
        MessageKind::BeginMove,
        MessageKind::EndMove,
        MessageKind::EndGame,
        MessageKind::ChangeName,
    ];
}

impl TryFrom<u8> for MessageKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MessageKind::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(ProtocolError::UnknownKind(value))
    }
}

/// The `{roll, piece, cell}` body shared by `BeginMove` and `EndMove`.
///
/// `roll` is the pool value being spent, `piece` the index of the
/// moved piece, `cell` the intended landing cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub roll: i8,
    pub piece: u8,
    pub cell: Cell,
}

/// A request decoded from a client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    CreateRoom { name: String },
    EnterRoom { room_id: RoomId, name: String },
    ExitRoom,
    SetPieceCount { piece_count: u8 },
    Ready { is_ready: bool },
    KickPlayer { player: ClientId },
    StartGame,
    BeginRoll,
    BeginMove(Move),
    EndMove(Move),
    ChangeName { name: String },
}

fn parse<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(payload).map_err(ProtocolError::Decode)
}

impl ClientRequest {
    /// Decodes the request carried by a frame.
    ///
    /// Returns `Ok(None)` for kinds a client has no business sending
    /// (keepalives, server-to-client kinds, the reserved `Quit`); those
    /// are silently dropped rather than treated as protocol violations.
    pub fn decode(kind: MessageKind, payload: &[u8]) -> Result<Option<Self>, ProtocolError> {
        let request = match kind {
            MessageKind::CreateRoom => {
                #[derive(Deserialize)]
                struct Body {
                    name: String,
                }
                let body: Body = parse(payload)?;
                Self::CreateRoom { name: body.name }
            }
            MessageKind::EnterRoom => {
                #[derive(Deserialize)]
                struct Body {
                    room_id: RoomId,
                    name: String,
                }
                let body: Body = parse(payload)?;
                Self::EnterRoom {
                    room_id: body.room_id,
                    name: body.name,
                }
            }
            MessageKind::ExitRoom => Self::ExitRoom,
            MessageKind::SetPieceCount => {
                #[derive(Deserialize)]
                struct Body {
                    piece_count: u8,
                }
                let body: Body = parse(payload)?;
                Self::SetPieceCount {
                    piece_count: body.piece_count,
                }
            }
            MessageKind::Ready => {
                #[derive(Deserialize)]
                struct Body {
                    is_ready: bool,
                }
                let body: Body = parse(payload)?;
                Self::Ready {
                    is_ready: body.is_ready,
                }
            }
            MessageKind::KickPlayer => {
                #[derive(Deserialize)]
                struct Body {
                    player: ClientId,
                }
                let body: Body = parse(payload)?;
                Self::KickPlayer {
                    player: body.player,
                }
            }
            MessageKind::StartGame => Self::StartGame,
            MessageKind::BeginRoll => Self::BeginRoll,
            MessageKind::BeginMove => Self::BeginMove(parse(payload)?),
            MessageKind::EndMove => Self::EndMove(parse(payload)?),
            MessageKind::ChangeName => {
                #[derive(Deserialize)]
                struct Body {
                    name: String,
                }
                let body: Body = parse(payload)?;
                Self::ChangeName { name: body.name }
            }
            _ => return Ok(None),
        };
        Ok(Some(request))
    }
}

/// An event the server sends to clients.
///
/// Each variant maps to one [`MessageKind`]; its fields serialize to
/// the payload object. Variants double as responses: the rejected
/// forms below are the zero-valued payloads a denied request gets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerEvent {
    Keepalive,
    Connect {
        client_id: ClientId,
    },
    CreateRoom {
        room_id: RoomId,
    },
    ExitRoom {
        exit: bool,
    },
    SetPieceCount {
        should_set: bool,
        piece_count: u8,
    },
    PlayerLeft {
        player: ClientId,
        master: ClientId,
        kicked: bool,
    },
    EnterRoom {
        room_id: RoomId,
        join: bool,
        master: ClientId,
        piece_count: u8,
        players: Vec<PlayerEntry>,
    },
    PlayerJoined {
        client_id: ClientId,
        name: String,
    },
    Ready {
        player: ClientId,
        is_ready: bool,
    },
    StartGame {
        should_start: bool,
        starting_player: ClientId,
    },
    BeginTurn,
    CanRoll {
        player: ClientId,
    },
    EndRoll {
        should_append: bool,
        roll: i8,
    },
    EndTurn {
        next_player: ClientId,
    },
    SelectingMove {
        player: ClientId,
    },
    BeginMove {
        player: ClientId,
        should_move: bool,
        roll: i8,
        cell: Cell,
        piece: u8,
        finished: bool,
    },
    EndGame {
        winner: ClientId,
    },
    ChangeName {
        player: ClientId,
        name: String,
    },
}

impl ServerEvent {
    /// The wire kind this event is framed as.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Keepalive => MessageKind::Keepalive,
            Self::Connect { .. } => MessageKind::Connect,
            Self::CreateRoom { .. } => MessageKind::CreateRoom,
            Self::ExitRoom { .. } => MessageKind::ExitRoom,
            Self::SetPieceCount { .. } => MessageKind::SetPieceCount,
            Self::PlayerLeft { .. } => MessageKind::PlayerLeft,
            Self::EnterRoom { .. } => MessageKind::EnterRoom,
            Self::PlayerJoined { .. } => MessageKind::PlayerJoined,
            Self::Ready { .. } => MessageKind::Ready,
            Self::StartGame { .. } => MessageKind::StartGame,
            Self::BeginTurn => MessageKind::BeginTurn,
            Self::CanRoll { .. } => MessageKind::CanRoll,
            Self::EndRoll { .. } => MessageKind::EndRoll,
            Self::EndTurn { .. } => MessageKind::EndTurn,
            Self::SelectingMove { .. } => MessageKind::SelectingMove,
            Self::BeginMove { .. } => MessageKind::BeginMove,
            Self::EndGame { .. } => MessageKind::EndGame,
            Self::ChangeName { .. } => MessageKind::ChangeName,
        }
    }

    /// Serializes just the JSON payload; empty for bodyless kinds.
    pub fn payload(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Keepalive | Self::BeginTurn => Ok(Vec::new()),
            _ => serde_json::to_vec(self).map_err(ProtocolError::Encode),
        }
    }

    /// Serializes the complete wire frame for this event.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Frame::encode(self.kind(), &self.payload()?)
    }

    /// The response a join attempt gets when the room is full or gone.
    pub fn join_rejected() -> Self {
        Self::EnterRoom {
            room_id: RoomId::default(),
            join: false,
            master: ClientId::default(),
            piece_count: 0,
            players: Vec::new(),
        }
    }

    /// The response a denied `SetPieceCount` gets.
    pub fn set_piece_count_rejected() -> Self {
        Self::SetPieceCount {
            should_set: false,
            piece_count: 0,
        }
    }

    /// The response a denied `StartGame` gets.
    pub fn start_rejected() -> Self {
        Self::StartGame {
            should_start: false,
            starting_player: ClientId::default(),
        }
    }

    /// The response an illegal `BeginMove` gets.
    pub fn move_rejected() -> Self {
        Self::BeginMove {
            player: ClientId::default(),
            should_move: false,
            roll: 0,
            cell: Cell::BottomRight,
            piece: 0,
            finished: false,
        }
    }

    /// The response a `Ready` outside any room gets.
    pub fn ready_rejected() -> Self {
        Self::Ready {
            player: ClientId::default(),
            is_ready: false,
        }
    }

    /// The response an `ExitRoom` outside any room gets.
    pub fn exit_rejected() -> Self {
        Self::ExitRoom { exit: false }
    }
}
