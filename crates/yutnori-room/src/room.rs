//! Room actor: an isolated Tokio task owning one room.
//!
//! Each room is driven by a single mailbox; every mutation of the
//! member list, the master, or the game instance happens inside the
//! actor loop, one command at a time. The outside world holds a
//! [`RoomHandle`] (cheap to clone, just an mpsc sender) and per-member
//! [`MemberHandle`]s through which the actor reaches each endpoint.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use yutnori_protocol::{ClientId, Move, PlayerEntry, Recipient, RoomId, ServerEvent};

use crate::game::{GameInstance, GameState, Outcome, Player};
use crate::{RoomError, MAX_PIECE_COUNT, MAX_PLAYER_COUNT, MIN_PIECE_COUNT};

/// Capacity of each member's outbound byte queue. A connection that
/// falls this far behind is considered failed and is torn down.
pub const OUTBOUND_QUEUE: usize = 128;

/// Depth of a room's command mailbox.
const MAILBOX_SIZE: usize = 64;

/// Notices a room sends to an endpoint's writer task, which is the
/// sole owner of that endpoint's current-room pointer.
#[derive(Debug, Clone)]
pub enum MemberNotice {
    /// The endpoint joined this room.
    Entered(RoomHandle),
    /// The endpoint left its room (voluntarily or kicked).
    Exited,
    /// The connection is considered failed; the writer must stop.
    Close,
}

/// The room-facing half of a client endpoint: its identity plus the
/// channels that reach its writer task.
#[derive(Debug, Clone)]
pub struct MemberHandle {
    client_id: ClientId,
    outbound: mpsc::Sender<Vec<u8>>,
    notices: mpsc::UnboundedSender<MemberNotice>,
}

impl MemberHandle {
    pub fn new(
        client_id: ClientId,
        outbound: mpsc::Sender<Vec<u8>>,
        notices: mpsc::UnboundedSender<MemberNotice>,
    ) -> Self {
        Self {
            client_id,
            outbound,
            notices,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Queues already-serialized frame bytes for the writer. Returns
    /// `false` when the queue is full or the writer is gone.
    pub fn enqueue(&self, bytes: Vec<u8>) -> bool {
        self.outbound.try_send(bytes).is_ok()
    }

    /// Serializes a single event and queues it.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match event.encode() {
            Ok(bytes) => self.enqueue(bytes),
            Err(e) => {
                tracing::error!(client_id = %self.client_id, error = %e, "failed to encode event");
                false
            }
        }
    }

    pub fn notify(&self, notice: MemberNotice) {
        let _ = self.notices.send(notice);
    }
}

/// Commands accepted by a room's mailbox.
pub(crate) enum RoomCommand {
    Enter { member: MemberHandle, name: String },
    Exit { client_id: ClientId, kicked: bool },
    Ready { client_id: ClientId, is_ready: bool },
    SetPieceCount { client_id: ClientId, count: u8 },
    StartGame { client_id: ClientId },
    ChangeName { client_id: ClientId, name: String },
    BeginRoll { client_id: ClientId },
    BeginMove { client_id: ClientId, mv: Move },
    EndMove { client_id: ClientId, mv: Move },
}

/// Handle to a running room actor.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    pub async fn enter(&self, member: MemberHandle, name: String) -> Result<(), RoomError> {
        self.send(RoomCommand::Enter { member, name }).await
    }

    pub async fn exit(&self, client_id: ClientId, kicked: bool) -> Result<(), RoomError> {
        self.send(RoomCommand::Exit { client_id, kicked }).await
    }

    pub async fn ready(&self, client_id: ClientId, is_ready: bool) -> Result<(), RoomError> {
        self.send(RoomCommand::Ready { client_id, is_ready }).await
    }

    pub async fn set_piece_count(&self, client_id: ClientId, count: u8) -> Result<(), RoomError> {
        self.send(RoomCommand::SetPieceCount { client_id, count }).await
    }

    pub async fn start_game(&self, client_id: ClientId) -> Result<(), RoomError> {
        self.send(RoomCommand::StartGame { client_id }).await
    }

    pub async fn change_name(&self, client_id: ClientId, name: String) -> Result<(), RoomError> {
        self.send(RoomCommand::ChangeName { client_id, name }).await
    }

    pub async fn begin_roll(&self, client_id: ClientId) -> Result<(), RoomError> {
        self.send(RoomCommand::BeginRoll { client_id }).await
    }

    pub async fn begin_move(&self, client_id: ClientId, mv: Move) -> Result<(), RoomError> {
        self.send(RoomCommand::BeginMove { client_id, mv }).await
    }

    pub async fn end_move(&self, client_id: ClientId, mv: Move) -> Result<(), RoomError> {
        self.send(RoomCommand::EndMove { client_id, mv }).await
    }
}

/// Spawns a room actor with `master` as its founding member.
///
/// The actor notifies the master's endpoint that it entered, runs until
/// the last member leaves, then reports its id on `destroyed` so the
/// hub can drop the table entry.
pub fn spawn_room(
    room_id: RoomId,
    master: MemberHandle,
    master_name: String,
    destroyed: mpsc::UnboundedSender<RoomId>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_SIZE);
    let handle = RoomHandle {
        room_id: room_id.clone(),
        sender: tx,
    };

    let master_id = master.client_id().clone();
    let mut game = GameInstance::new();
    game.players.push(Player::new(master_id.clone(), master_name));
    let mut senders = HashMap::new();
    senders.insert(master_id.clone(), master);

    let actor = RoomActor {
        room_id,
        handle: handle.clone(),
        master: master_id,
        game,
        senders,
        dead: Vec::new(),
        destroyed,
        rng: StdRng::from_entropy(),
        receiver: rx,
    };
    tokio::spawn(actor.run());
    handle
}

struct RoomActor {
    room_id: RoomId,
    /// This room's own handle, given to endpoints as they enter.
    handle: RoomHandle,
    master: ClientId,
    game: GameInstance,
    senders: HashMap<ClientId, MemberHandle>,
    /// Members whose outbound queue overflowed during a dispatch; they
    /// are evicted once the triggering command finishes.
    dead: Vec<ClientId>,
    destroyed: mpsc::UnboundedSender<RoomId>,
    rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, master = %self.master, "room actor started");
        if let Some(master) = self.senders.get(&self.master) {
            master.notify(MemberNotice::Entered(self.handle.clone()));
        }

        while let Some(command) = self.receiver.recv().await {
            self.handle_command(command);
            if self.game.players.is_empty() {
                break;
            }
        }

        // Joins racing with the shutdown still deserve an answer: stop
        // accepting, then reject whatever made it into the mailbox.
        self.receiver.close();
        while let Ok(command) = self.receiver.try_recv() {
            if let RoomCommand::Enter { member, .. } = command {
                member.send_event(&ServerEvent::join_rejected());
            }
        }

        let _ = self.destroyed.send(self.room_id.clone());
        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Enter { member, name } => self.handle_enter(member, name),
            RoomCommand::Exit { client_id, kicked } => self.handle_exit(&client_id, kicked),
            RoomCommand::Ready { client_id, is_ready } => self.handle_ready(&client_id, is_ready),
            RoomCommand::SetPieceCount { client_id, count } => {
                self.handle_set_piece_count(&client_id, count)
            }
            RoomCommand::StartGame { client_id } => self.handle_start_game(&client_id),
            RoomCommand::ChangeName { client_id, name } => {
                self.handle_change_name(&client_id, name)
            }
            RoomCommand::BeginRoll { client_id } => {
                let events = self.game.begin_roll(&client_id, &mut self.rng);
                self.dispatch(events);
            }
            RoomCommand::BeginMove { client_id, mv } => {
                let events = self.game.begin_move(&client_id, mv);
                self.dispatch(events);
            }
            RoomCommand::EndMove { client_id, mv } => {
                let events = self.game.end_move(&client_id, mv);
                self.dispatch(events);
            }
        }

        // Evict members whose connections overflowed while handling the
        // command. Their departure may overflow further queues, so drain
        // until quiet.
        while let Some(client_id) = self.dead.pop() {
            if let Some(member) = self.senders.get(&client_id) {
                tracing::warn!(
                    room_id = %self.room_id,
                    %client_id,
                    "outbound queue overflowed, dropping connection"
                );
                member.notify(MemberNotice::Close);
                self.handle_exit(&client_id, false);
            }
        }
    }

    fn handle_enter(&mut self, member: MemberHandle, name: String) {
        if self.game.players.len() >= MAX_PLAYER_COUNT {
            tracing::debug!(room_id = %self.room_id, client_id = %member.client_id(), "room full, rejecting join");
            member.send_event(&ServerEvent::join_rejected());
            return;
        }

        let snapshot = ServerEvent::EnterRoom {
            room_id: self.room_id.clone(),
            join: true,
            master: self.master.clone(),
            piece_count: self.game.piece_count,
            players: self
                .game
                .players
                .iter()
                .map(|p| PlayerEntry {
                    client_id: p.client_id.clone(),
                    name: p.name.clone(),
                    is_ready: p.is_ready,
                })
                .collect(),
        };
        member.send_event(&snapshot);

        // Broadcast before adding the joiner so it does not echo back.
        let joined = ServerEvent::PlayerJoined {
            client_id: member.client_id().clone(),
            name: name.clone(),
        };
        self.dispatch(vec![(Recipient::All, joined)]);

        let client_id = member.client_id().clone();
        self.game.players.push(Player::new(client_id.clone(), name));
        member.notify(MemberNotice::Entered(self.handle.clone()));
        self.senders.insert(client_id.clone(), member);
        tracing::info!(
            room_id = %self.room_id,
            %client_id,
            players = self.game.players.len(),
            "player joined"
        );
    }

    fn handle_exit(&mut self, client_id: &ClientId, kicked: bool) {
        let Some(idx) = self.game.player_index(client_id) else {
            return;
        };

        // Any departure mid-game voids the game for everyone.
        if self.game.state != GameState::GameEnded {
            self.game.reset();
        }
        self.game.players.swap_remove(idx);
        let leaver = self.senders.remove(client_id);

        if client_id == &self.master {
            self.master = match self.game.players.len() {
                0 => ClientId::default(),
                n => {
                    let pick = self.rng.gen_range(0..n);
                    let elected = self.game.players[pick].client_id.clone();
                    tracing::info!(room_id = %self.room_id, master = %elected, "new master elected");
                    elected
                }
            };
        }

        let left = ServerEvent::PlayerLeft {
            player: client_id.clone(),
            master: self.master.clone(),
            kicked,
        };
        // The leaver still learns it left (and, when kicked, why) before
        // its pointer is cleared; its queue may already be gone, which
        // is fine.
        if let Some(leaver) = &leaver {
            if !kicked {
                leaver.send_event(&ServerEvent::ExitRoom { exit: true });
            }
            leaver.send_event(&left);
            leaver.notify(MemberNotice::Exited);
        }
        self.dispatch(vec![(Recipient::All, left)]);
        tracing::info!(
            room_id = %self.room_id,
            %client_id,
            kicked,
            players = self.game.players.len(),
            "player left"
        );
    }

    fn handle_ready(&mut self, client_id: &ClientId, is_ready: bool) {
        let Some(idx) = self.game.player_index(client_id) else {
            tracing::debug!(room_id = %self.room_id, %client_id, "ready from non-member, ignoring");
            return;
        };
        self.game.players[idx].is_ready = is_ready;
        self.dispatch(vec![(
            Recipient::All,
            ServerEvent::Ready {
                player: client_id.clone(),
                is_ready,
            },
        )]);
    }

    fn handle_set_piece_count(&mut self, client_id: &ClientId, count: u8) {
        if client_id != &self.master || self.game.state != GameState::GameEnded {
            if let Some(member) = self.senders.get(client_id) {
                member.send_event(&ServerEvent::set_piece_count_rejected());
            }
            return;
        }
        let count = count.clamp(MIN_PIECE_COUNT, MAX_PIECE_COUNT);
        self.game.piece_count = count;
        self.dispatch(vec![(
            Recipient::All,
            ServerEvent::SetPieceCount {
                should_set: true,
                piece_count: count,
            },
        )]);
    }

    fn handle_start_game(&mut self, client_id: &ClientId) {
        let events = if client_id == &self.master {
            self.game.start(client_id, &mut self.rng)
        } else {
            vec![(
                Recipient::Player(client_id.clone()),
                ServerEvent::start_rejected(),
            )]
        };
        self.dispatch(events);
    }

    fn handle_change_name(&mut self, client_id: &ClientId, name: String) {
        let Some(idx) = self.game.player_index(client_id) else {
            return;
        };
        self.game.players[idx].name = name.clone();
        self.dispatch(vec![(
            Recipient::All,
            ServerEvent::ChangeName {
                player: client_id.clone(),
                name,
            },
        )]);
    }

    /// Serializes each event once and fans the bytes out to its
    /// recipients. Members whose queue rejects the bytes are recorded
    /// for eviction.
    fn dispatch(&mut self, events: Outcome) {
        for (recipient, event) in events {
            let bytes = match event.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(room_id = %self.room_id, error = %e, "failed to encode event");
                    continue;
                }
            };
            match recipient {
                Recipient::All => {
                    for (client_id, member) in &self.senders {
                        if !member.enqueue(bytes.clone()) && !self.dead.contains(client_id) {
                            self.dead.push(client_id.clone());
                        }
                    }
                }
                Recipient::Player(client_id) => {
                    if let Some(member) = self.senders.get(&client_id) {
                        if !member.enqueue(bytes) && !self.dead.contains(&client_id) {
                            self.dead.push(client_id);
                        }
                    }
                }
                Recipient::AllExcept(excluded) => {
                    for (client_id, member) in &self.senders {
                        if client_id == &excluded {
                            continue;
                        }
                        if !member.enqueue(bytes.clone()) && !self.dead.contains(client_id) {
                            self.dead.push(client_id.clone());
                        }
                    }
                }
            }
        }
    }
}
