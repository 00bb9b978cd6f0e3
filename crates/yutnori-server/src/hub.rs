//! Hub actor: accepts registrations, mints identities, and owns the
//! room table.
//!
//! The hub is a single task selecting over its command mailbox and a
//! room-destroyed channel. Rooms and connections never touch the table
//! directly; everything arrives as a command.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use yutnori_protocol::{ClientId, RoomId, ServerEvent};
use yutnori_room::{spawn_room, MemberHandle, RoomHandle};

use crate::endpoint;

pub(crate) enum HubCommand {
    /// A freshly accepted connection to identify and wire up.
    Register(TcpStream),
    /// A client wants a new room with itself as master.
    CreateRoom { member: MemberHandle, name: String },
    /// A client wants into an existing room.
    EnterRoom {
        member: MemberHandle,
        name: String,
        room_id: RoomId,
    },
    /// A connection ended; release its identity.
    Unregister(ClientId),
}

/// Handle to the hub actor. Cheap to clone.
#[derive(Debug, Clone)]
pub(crate) struct HubHandle {
    sender: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    pub(crate) fn register(&self, stream: TcpStream) {
        let _ = self.sender.send(HubCommand::Register(stream));
    }

    pub(crate) fn create_room(&self, member: MemberHandle, name: String) {
        let _ = self.sender.send(HubCommand::CreateRoom { member, name });
    }

    pub(crate) fn enter_room(&self, member: MemberHandle, name: String, room_id: RoomId) {
        let _ = self.sender.send(HubCommand::EnterRoom {
            member,
            name,
            room_id,
        });
    }

    pub(crate) fn unregister(&self, client_id: ClientId) {
        let _ = self.sender.send(HubCommand::Unregister(client_id));
    }
}

/// Spawns the hub actor task and returns its handle.
pub(crate) fn spawn_hub() -> HubHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (gone_tx, gone_rx) = mpsc::unbounded_channel();
    let handle = HubHandle { sender: tx };
    let hub = Hub {
        rooms: HashMap::new(),
        clients: HashSet::new(),
        gone: gone_tx,
        rng: StdRng::from_entropy(),
        handle: handle.clone(),
    };
    tokio::spawn(hub.run(rx, gone_rx));
    handle
}

struct Hub {
    rooms: HashMap<RoomId, RoomHandle>,
    /// Identities of live connections; collisions are regenerated away.
    clients: HashSet<ClientId>,
    gone: mpsc::UnboundedSender<RoomId>,
    rng: StdRng,
    handle: HubHandle,
}

impl Hub {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<HubCommand>,
        mut gone: mpsc::UnboundedReceiver<RoomId>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(room_id) = gone.recv() => {
                    self.rooms.remove(&room_id);
                    tracing::info!(%room_id, rooms = self.rooms.len(), "room destroyed");
                }
            }
        }
    }

    async fn handle_command(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(stream) => self.register(stream),
            HubCommand::CreateRoom { member, name } => self.create_room(member, name),
            HubCommand::EnterRoom {
                member,
                name,
                room_id,
            } => self.enter_room(member, name, room_id).await,
            HubCommand::Unregister(client_id) => {
                self.clients.remove(&client_id);
                tracing::debug!(%client_id, clients = self.clients.len(), "client unregistered");
            }
        }
    }

    fn register(&mut self, stream: TcpStream) {
        let client_id = loop {
            let id = ClientId::generate(&mut self.rng);
            if self.clients.insert(id.clone()) {
                break id;
            }
        };
        tracing::info!(
            %client_id,
            peer = ?stream.peer_addr().ok(),
            clients = self.clients.len(),
            "client connected"
        );
        endpoint::spawn(stream, client_id, self.handle.clone());
    }

    fn create_room(&mut self, member: MemberHandle, name: String) {
        let room_id = loop {
            let id = RoomId::generate(&mut self.rng);
            if !self.rooms.contains_key(&id) {
                break id;
            }
        };
        member.send_event(&ServerEvent::CreateRoom {
            room_id: room_id.clone(),
        });
        let creator = member.client_id().clone();
        let handle = spawn_room(room_id.clone(), member, name, self.gone.clone());
        self.rooms.insert(room_id.clone(), handle);
        tracing::info!(%room_id, client_id = %creator, rooms = self.rooms.len(), "room created");
    }

    async fn enter_room(&mut self, member: MemberHandle, name: String, room_id: RoomId) {
        tracing::debug!(client_id = %member.client_id(), %room_id, "join requested");
        match self.rooms.get(&room_id) {
            Some(room) => {
                // A room that emptied between lookup and delivery answers
                // like a missing one.
                if room.enter(member.clone(), name).await.is_err() {
                    member.send_event(&ServerEvent::join_rejected());
                }
            }
            None => {
                member.send_event(&ServerEvent::join_rejected());
            }
        }
    }
}
