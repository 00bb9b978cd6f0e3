//! Client endpoint: a dedicated reader and writer per connection.
//!
//! The reader decodes frames and routes them to the hub or the current
//! room. The writer drains the outbound queue, applies room notices to
//! the current-room pointer (it is the pointer's only writer), and
//! emits a keepalive when the connection has been idle for a minute.
//! Either task ending tears the whole endpoint down.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use yutnori_protocol::{
    read_frame, write_frame, ClientId, ClientRequest, Frame, MessageKind, ServerEvent,
};
use yutnori_room::{MemberHandle, MemberNotice, RoomHandle, OUTBOUND_QUEUE};

use crate::error::ServerError;
use crate::hub::HubHandle;

/// Idle time before the writer emits a keepalive frame.
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(60);

/// The endpoint's current room. Written only by the writer task in
/// response to room notices; read by the reader to route requests.
type CurrentRoom = Arc<RwLock<Option<RoomHandle>>>;

fn current(room: &CurrentRoom) -> Option<RoomHandle> {
    match room.read() {
        Ok(guard) => guard.clone(),
        Err(_) => None,
    }
}

fn set_current(room: &CurrentRoom, value: Option<RoomHandle>) {
    if let Ok(mut guard) = room.write() {
        *guard = value;
    }
}

/// Wires up reader, writer, and supervisor tasks for one connection
/// and sends the `Connect` handshake.
pub(crate) fn spawn(stream: TcpStream, client_id: ClientId, hub: HubHandle) {
    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE);
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let member = MemberHandle::new(client_id.clone(), out_tx, notice_tx);

    member.send_event(&ServerEvent::Connect { client_id });

    let (read_half, write_half) = stream.into_split();
    let room: CurrentRoom = Arc::new(RwLock::new(None));

    let reader = tokio::spawn(read_loop(
        read_half,
        member.clone(),
        Arc::clone(&room),
        hub.clone(),
    ));
    let writer = tokio::spawn(write_loop(write_half, out_rx, notice_rx, Arc::clone(&room)));
    tokio::spawn(supervise(reader, writer, member, room, hub));
}

/// Waits for either loop to finish, stops the other, and cleans up:
/// the current room gets an exit and the hub releases the identity.
async fn supervise(
    mut reader: JoinHandle<Result<(), ServerError>>,
    mut writer: JoinHandle<Result<(), ServerError>>,
    member: MemberHandle,
    room: CurrentRoom,
    hub: HubHandle,
) {
    let outcome = tokio::select! {
        outcome = &mut reader => {
            writer.abort();
            outcome
        }
        outcome = &mut writer => {
            reader.abort();
            outcome
        }
    };
    if let Ok(Err(e)) = outcome {
        tracing::debug!(client_id = %member.client_id(), error = %e, "connection error");
    }

    if let Some(room) = current(&room) {
        let _ = room.exit(member.client_id().clone(), false).await;
    }
    hub.unregister(member.client_id().clone());
    tracing::info!(client_id = %member.client_id(), "client disconnected");
}

async fn read_loop(
    mut stream: OwnedReadHalf,
    member: MemberHandle,
    room: CurrentRoom,
    hub: HubHandle,
) -> Result<(), ServerError> {
    loop {
        let frame = read_frame(&mut stream).await?;
        // Malformed payloads close the connection; recognized kinds a
        // client should not send are dropped.
        let Some(request) = ClientRequest::decode(frame.kind, &frame.payload)? else {
            tracing::debug!(
                client_id = %member.client_id(),
                kind = ?frame.kind,
                "dropping client frame with server-only kind"
            );
            continue;
        };
        handle_request(&member, &room, &hub, request).await;
    }
}

/// Routes one decoded request to the hub or the current room.
///
/// Requests that need a room but have none are answered locally with
/// the matching negative form, or dropped when no response form
/// exists. Failures to reach a room mean the pointer is stale (the
/// room emptied moments ago) and are treated the same way as sends to
/// a full mailbox: silently, the room's own exit flow handles state.
async fn handle_request(
    member: &MemberHandle,
    room: &CurrentRoom,
    hub: &HubHandle,
    request: ClientRequest,
) {
    let client_id = || member.client_id().clone();
    let current = current(room);
    match request {
        ClientRequest::CreateRoom { name } => hub.create_room(member.clone(), name),
        ClientRequest::EnterRoom { room_id, name } => {
            hub.enter_room(member.clone(), name, room_id)
        }
        ClientRequest::ExitRoom => match current {
            Some(room) => {
                let _ = room.exit(client_id(), false).await;
            }
            None => {
                member.send_event(&ServerEvent::exit_rejected());
            }
        },
        ClientRequest::SetPieceCount { piece_count } => match current {
            Some(room) => {
                let _ = room.set_piece_count(client_id(), piece_count).await;
            }
            None => {
                member.send_event(&ServerEvent::set_piece_count_rejected());
            }
        },
        ClientRequest::Ready { is_ready } => match current {
            Some(room) => {
                let _ = room.ready(client_id(), is_ready).await;
            }
            None => {
                member.send_event(&ServerEvent::ready_rejected());
            }
        },
        ClientRequest::KickPlayer { player } => {
            if let Some(room) = current {
                let _ = room.exit(player, true).await;
            }
        }
        ClientRequest::StartGame => match current {
            Some(room) => {
                let _ = room.start_game(client_id()).await;
            }
            None => {
                member.send_event(&ServerEvent::start_rejected());
            }
        },
        ClientRequest::BeginRoll => {
            if let Some(room) = current {
                let _ = room.begin_roll(client_id()).await;
            }
        }
        ClientRequest::BeginMove(mv) => {
            if let Some(room) = current {
                let _ = room.begin_move(client_id(), mv).await;
            }
        }
        ClientRequest::EndMove(mv) => {
            if let Some(room) = current {
                let _ = room.end_move(client_id(), mv).await;
            }
        }
        ClientRequest::ChangeName { name } => {
            if let Some(room) = current {
                let _ = room.change_name(client_id(), name).await;
            }
        }
    }
}

async fn write_loop(
    mut stream: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    mut notices: mpsc::UnboundedReceiver<MemberNotice>,
    room: CurrentRoom,
) -> Result<(), ServerError> {
    let keepalive = Frame::encode(MessageKind::Keepalive, &[]).expect("empty frame always encodes");
    let mut idle = interval_at(Instant::now() + KEEPALIVE_PERIOD, KEEPALIVE_PERIOD);

    loop {
        tokio::select! {
            bytes = outbound.recv() => match bytes {
                Some(bytes) => {
                    write_frame(&mut stream, &bytes).await?;
                    idle.reset();
                }
                None => return Ok(()),
            },
            notice = notices.recv() => match notice {
                Some(MemberNotice::Entered(handle)) => set_current(&room, Some(handle)),
                Some(MemberNotice::Exited) => set_current(&room, None),
                Some(MemberNotice::Close) | None => return Ok(()),
            },
            _ = idle.tick() => {
                write_frame(&mut stream, &keepalive).await?;
            }
        }
    }
}
