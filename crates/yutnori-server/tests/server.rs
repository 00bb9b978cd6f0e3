//! End-to-end tests over real TCP connections.
//!
//! Each test binds a server on an ephemeral port and speaks the actual
//! wire protocol. Dice are the server's own, so the game-flow test
//! adapts to whatever is rolled instead of assuming values.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use yutnori_board::{move_sequence, Piece};
use yutnori_protocol::{read_frame, write_frame, Frame, MessageKind};
use yutnori_server::Server;

async fn start_server() -> String {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

struct Client {
    stream: TcpStream,
    id: String,
}

impl Client {
    /// Reads the next non-keepalive frame and parses its payload.
    async fn recv(&mut self) -> (MessageKind, Value) {
        loop {
            let frame = timeout(Duration::from_secs(5), read_frame(&mut self.stream))
                .await
                .expect("timed out waiting for a frame")
                .expect("read failed");
            if frame.kind == MessageKind::Keepalive {
                continue;
            }
            let payload = if frame.payload.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&frame.payload).expect("invalid payload json")
            };
            return (frame.kind, payload);
        }
    }

    async fn expect(&mut self, kind: MessageKind) -> Value {
        let (got, payload) = self.recv().await;
        assert_eq!(got, kind, "expected {kind:?}, got {got:?} with {payload}");
        payload
    }

    /// Skips frames until `kind` arrives.
    async fn recv_until(&mut self, kind: MessageKind) -> Value {
        loop {
            let (got, payload) = self.recv().await;
            if got == kind {
                return payload;
            }
        }
    }

    async fn send(&mut self, kind: MessageKind, payload: Value) {
        let body = if payload.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&payload).unwrap()
        };
        let bytes = Frame::encode(kind, &body).unwrap();
        write_frame(&mut self.stream, &bytes).await.unwrap();
    }
}

async fn connect(addr: &str) -> Client {
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut client = Client {
        stream,
        id: String::new(),
    };
    let hello = client.expect(MessageKind::Connect).await;
    client.id = hello["client_id"].as_str().unwrap().to_string();
    client
}

async fn create_room(client: &mut Client, name: &str) -> String {
    client
        .send(MessageKind::CreateRoom, json!({ "name": name }))
        .await;
    let created = client.expect(MessageKind::CreateRoom).await;
    created["room_id"].as_str().unwrap().to_string()
}

async fn enter_room(client: &mut Client, room_id: &str, name: &str) -> Value {
    client
        .send(
            MessageKind::EnterRoom,
            json!({ "room_id": room_id, "name": name }),
        )
        .await;
    client.expect(MessageKind::EnterRoom).await
}

#[tokio::test]
async fn connect_assigns_distinct_identifiers() {
    let addr = start_server().await;
    let alice = connect(&addr).await;
    let bob = connect(&addr).await;
    assert_eq!(alice.id.len(), 32);
    assert_eq!(bob.id.len(), 32);
    assert_ne!(alice.id, bob.id);
}

#[tokio::test]
async fn create_then_enter_shares_the_room() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;

    let room_id = create_room(&mut alice, "alice").await;

    let snapshot = enter_room(&mut bob, &room_id, "bob").await;
    assert_eq!(snapshot["join"], true);
    assert_eq!(snapshot["room_id"], room_id.as_str());
    assert_eq!(snapshot["master"], alice.id.as_str());
    assert_eq!(snapshot["piece_count"], 2);
    let players = snapshot["players"].as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["client_id"], alice.id.as_str());
    assert_eq!(players[0]["name"], "alice");

    let joined = alice.expect(MessageKind::PlayerJoined).await;
    assert_eq!(joined["client_id"], bob.id.as_str());
    assert_eq!(joined["name"], "bob");
}

#[tokio::test]
async fn entering_an_unknown_room_is_rejected() {
    let addr = start_server().await;
    let mut bob = connect(&addr).await;
    let rejection = enter_room(&mut bob, "NOSUCHROOM", "bob").await;
    assert_eq!(rejection["join"], false);
}

#[tokio::test]
async fn room_actions_without_a_room_are_denied_locally() {
    let addr = start_server().await;
    let mut loner = connect(&addr).await;

    loner
        .send(MessageKind::SetPieceCount, json!({ "piece_count": 4 }))
        .await;
    let denied = loner.expect(MessageKind::SetPieceCount).await;
    assert_eq!(denied["should_set"], false);

    loner.send(MessageKind::StartGame, Value::Null).await;
    let denied = loner.expect(MessageKind::StartGame).await;
    assert_eq!(denied["should_start"], false);

    loner.send(MessageKind::ExitRoom, Value::Null).await;
    let denied = loner.expect(MessageKind::ExitRoom).await;
    assert_eq!(denied["exit"], false);
}

/// Creates a room, seats both players, readies them, and starts the
/// game. Returns the id of the starting player.
async fn setup_two_player_game(alice: &mut Client, bob: &mut Client) -> String {
    let room_id = create_room(alice, "alice").await;
    let snapshot = enter_room(bob, &room_id, "bob").await;
    assert_eq!(snapshot["join"], true);
    alice.expect(MessageKind::PlayerJoined).await;

    alice
        .send(MessageKind::Ready, json!({ "is_ready": true }))
        .await;
    bob.send(MessageKind::Ready, json!({ "is_ready": true }))
        .await;
    for client in [&mut *alice, &mut *bob] {
        for _ in 0..2 {
            let ready = client.expect(MessageKind::Ready).await;
            assert_eq!(ready["is_ready"], true);
        }
    }

    alice.send(MessageKind::StartGame, Value::Null).await;
    let started = alice.expect(MessageKind::StartGame).await;
    assert_eq!(started["should_start"], true);
    let starter = started["starting_player"].as_str().unwrap().to_string();
    assert!(starter == alice.id || starter == bob.id);
    assert_eq!(bob.expect(MessageKind::StartGame).await, started);

    alice.expect(MessageKind::BeginTurn).await;
    bob.expect(MessageKind::BeginTurn).await;
    starter
}

#[tokio::test]
async fn start_requires_master_and_ready_members() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let room_id = create_room(&mut alice, "alice").await;
    enter_room(&mut bob, &room_id, "bob").await;
    alice.expect(MessageKind::PlayerJoined).await;

    // Not the master.
    bob.send(MessageKind::StartGame, Value::Null).await;
    let denied = bob.expect(MessageKind::StartGame).await;
    assert_eq!(denied["should_start"], false);

    // Master, but nobody is ready.
    alice.send(MessageKind::StartGame, Value::Null).await;
    let denied = alice.expect(MessageKind::StartGame).await;
    assert_eq!(denied["should_start"], false);
}

fn by_turn<'a>(
    alice: &'a mut Client,
    bob: &'a mut Client,
    current: &str,
) -> (&'a mut Client, &'a mut Client) {
    if alice.id == current {
        (alice, bob)
    } else {
        (bob, alice)
    }
}

// Plays until one complete move is applied, following the server's
// actual dice: extra throws on 4/5, wiped pools on 0, wasted back-dos,
// and turn changes are all handled as they happen.
#[tokio::test]
async fn a_full_turn_plays_out_over_the_wire() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let starter = setup_two_player_game(&mut alice, &mut bob).await;

    let mut pieces: HashMap<String, Piece> = HashMap::new();
    pieces.insert(alice.id.clone(), Piece::home());
    pieces.insert(bob.id.clone(), Piece::home());
    let mut pool: Vec<i8> = Vec::new();
    let mut current = starter;
    let mut move_applied = false;

    for _ in 0..60 {
        let (cur, other) = by_turn(&mut alice, &mut bob, &current);

        let can_roll = cur.expect(MessageKind::CanRoll).await;
        assert_eq!(can_roll["player"], current.as_str());

        cur.send(MessageKind::BeginRoll, Value::Null).await;
        let end_roll = cur.expect(MessageKind::EndRoll).await;
        assert_eq!(other.expect(MessageKind::EndRoll).await, end_roll);
        let roll = end_roll["roll"].as_i64().unwrap() as i8;
        let appended = end_roll["should_append"].as_bool().unwrap();
        assert!((-1..=5).contains(&roll));
        if roll == 0 {
            assert!(!appended);
            pool.clear();
        } else if appended {
            pool.push(roll);
        }

        if roll == 4 || roll == 5 {
            // Another throw for the same player.
            continue;
        }
        if pool.is_empty() {
            // Nothing to spend: the turn passes.
            let end_turn = cur.expect(MessageKind::EndTurn).await;
            assert_eq!(other.expect(MessageKind::EndTurn).await, end_turn);
            cur.expect(MessageKind::BeginTurn).await;
            other.expect(MessageKind::BeginTurn).await;
            let next = end_turn["next_player"].as_str().unwrap().to_string();
            assert_ne!(next, current);
            current = next;
            continue;
        }

        let selecting = cur.expect(MessageKind::SelectingMove).await;
        assert_eq!(selecting["player"], current.as_str());

        // Spend the first pool entry piece 0 can actually use (a back-do
        // is unusable while the piece waits at start).
        let piece = pieces[&current];
        let usable = *pool
            .iter()
            .find(|&&roll| !move_sequence(piece, roll).is_empty())
            .expect("pool has no usable roll");
        let seq = move_sequence(piece, usable);
        let target = *seq.first.last().or_else(|| seq.second.last()).unwrap();
        let mv = json!({ "roll": usable, "piece": 0, "cell": u8::from(target) });

        cur.send(MessageKind::BeginMove, mv.clone()).await;
        let begin_move = cur.expect(MessageKind::BeginMove).await;
        assert_eq!(other.expect(MessageKind::BeginMove).await, begin_move);
        assert_eq!(begin_move["should_move"], true);
        assert_eq!(begin_move["player"], current.as_str());
        assert_eq!(begin_move["cell"], u8::from(target));

        cur.send(MessageKind::EndMove, mv.clone()).await;
        other.send(MessageKind::EndMove, mv).await;

        pool.remove(pool.iter().position(|&r| r == usable).unwrap());
        pieces.insert(current.clone(), Piece::on_board(target));
        move_applied = true;

        // First move of the game: the opponent has nothing on the
        // board, so no stomp is possible and the consequence is decided
        // by the pool alone.
        if pool.is_empty() {
            let end_turn = cur.expect(MessageKind::EndTurn).await;
            assert_eq!(
                other.expect(MessageKind::EndTurn).await["next_player"],
                end_turn["next_player"]
            );
            assert_eq!(end_turn["next_player"], other.id.as_str());
        } else {
            let selecting = cur.expect(MessageKind::SelectingMove).await;
            assert_eq!(selecting["player"], current.as_str());
        }
        break;
    }

    assert!(move_applied, "no move was applied within 60 turns");
}

#[tokio::test]
async fn illegal_moves_only_answer_the_sender() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let starter = setup_two_player_game(&mut alice, &mut bob).await;
    let (cur, other) = by_turn(&mut alice, &mut bob, &starter);
    cur.expect(MessageKind::CanRoll).await;

    // A move before anything was rolled is out of phase.
    cur.send(
        MessageKind::BeginMove,
        json!({ "roll": 3, "piece": 0, "cell": 3 }),
    )
    .await;
    let denied = cur.expect(MessageKind::BeginMove).await;
    assert_eq!(denied["should_move"], false);

    // The other player saw nothing; the next frame either receives is
    // the roll both observe once the turn proceeds.
    cur.send(MessageKind::BeginRoll, Value::Null).await;
    let end_roll = cur.expect(MessageKind::EndRoll).await;
    assert_eq!(other.expect(MessageKind::EndRoll).await, end_roll);
}

#[tokio::test]
async fn master_exit_hands_the_room_over() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let mut carol = connect(&addr).await;

    let room_id = create_room(&mut alice, "alice").await;
    enter_room(&mut bob, &room_id, "bob").await;
    alice.expect(MessageKind::PlayerJoined).await;
    enter_room(&mut carol, &room_id, "carol").await;
    alice.expect(MessageKind::PlayerJoined).await;
    bob.expect(MessageKind::PlayerJoined).await;

    alice.send(MessageKind::ExitRoom, Value::Null).await;
    let exited = alice.expect(MessageKind::ExitRoom).await;
    assert_eq!(exited["exit"], true);
    let left = alice.expect(MessageKind::PlayerLeft).await;
    assert_eq!(left["player"], alice.id.as_str());
    assert_eq!(left["kicked"], false);
    let new_master = left["master"].as_str().unwrap().to_string();
    assert!(new_master == bob.id || new_master == carol.id);

    for client in [&mut bob, &mut carol] {
        let seen = client.expect(MessageKind::PlayerLeft).await;
        assert_eq!(seen["master"], new_master.as_str());
    }

    // The handed-over master can reconfigure the room; the other cannot.
    let (master, other) = by_turn(&mut bob, &mut carol, &new_master);
    master
        .send(MessageKind::SetPieceCount, json!({ "piece_count": 5 }))
        .await;
    for client in [&mut *master, &mut *other] {
        let set = client.expect(MessageKind::SetPieceCount).await;
        assert_eq!(set["should_set"], true);
        assert_eq!(set["piece_count"], 5);
    }
    other
        .send(MessageKind::SetPieceCount, json!({ "piece_count": 3 }))
        .await;
    let denied = other.expect(MessageKind::SetPieceCount).await;
    assert_eq!(denied["should_set"], false);
}

#[tokio::test]
async fn kicked_player_loses_its_room() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let room_id = create_room(&mut alice, "alice").await;
    enter_room(&mut bob, &room_id, "bob").await;
    alice.expect(MessageKind::PlayerJoined).await;

    alice
        .send(MessageKind::KickPlayer, json!({ "player": bob.id }))
        .await;
    let left = bob.expect(MessageKind::PlayerLeft).await;
    assert_eq!(left["player"], bob.id.as_str());
    assert_eq!(left["kicked"], true);
    assert_eq!(left["master"], alice.id.as_str());
    alice.expect(MessageKind::PlayerLeft).await;

    // Room actions from the kicked player are now answered locally.
    // (Give the writer task a beat to apply the pointer-clearing notice;
    // it is delivered concurrently with the PlayerLeft frame.)
    tokio::time::sleep(Duration::from_millis(50)).await;
    bob.send(MessageKind::Ready, json!({ "is_ready": true }))
        .await;
    let denied = bob.expect(MessageKind::Ready).await;
    assert_eq!(denied["player"], "");
    assert_eq!(denied["is_ready"], false);
    // And the remaining member heard nothing about it.
    alice.send(MessageKind::Ready, json!({ "is_ready": true })).await;
    let ready = alice.expect(MessageKind::Ready).await;
    assert_eq!(ready["player"], alice.id.as_str());
}

#[tokio::test]
async fn an_emptied_room_is_destroyed() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;

    let room_id = create_room(&mut alice, "alice").await;
    alice.send(MessageKind::ExitRoom, Value::Null).await;
    alice.expect(MessageKind::ExitRoom).await;
    alice.expect(MessageKind::PlayerLeft).await;

    // The id no longer resolves.
    let rejection = enter_room(&mut bob, &room_id, "bob").await;
    assert_eq!(rejection["join"], false);
}

#[tokio::test]
async fn disconnect_mid_game_voids_the_game() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let mut carol = connect(&addr).await;

    let room_id = create_room(&mut alice, "alice").await;
    enter_room(&mut bob, &room_id, "bob").await;
    alice.expect(MessageKind::PlayerJoined).await;
    enter_room(&mut carol, &room_id, "carol").await;
    alice.expect(MessageKind::PlayerJoined).await;
    bob.expect(MessageKind::PlayerJoined).await;

    for client in [&mut alice, &mut bob, &mut carol] {
        client
            .send(MessageKind::Ready, json!({ "is_ready": true }))
            .await;
    }
    alice.send(MessageKind::StartGame, Value::Null).await;
    let started = alice.recv_until(MessageKind::StartGame).await;
    assert_eq!(started["should_start"], true);
    bob.recv_until(MessageKind::StartGame).await;

    // Carol's connection dies mid-game.
    let carol_id = carol.id.clone();
    drop(carol);
    let left = alice.recv_until(MessageKind::PlayerLeft).await;
    assert_eq!(left["player"], carol_id.as_str());
    bob.recv_until(MessageKind::PlayerLeft).await;

    // The game was reset: ready flags are gone, so a bare start is
    // denied, and re-readying the two survivors makes it legal again.
    alice.send(MessageKind::StartGame, Value::Null).await;
    let denied = alice.recv_until(MessageKind::StartGame).await;
    assert_eq!(denied["should_start"], false);

    alice
        .send(MessageKind::Ready, json!({ "is_ready": true }))
        .await;
    bob.send(MessageKind::Ready, json!({ "is_ready": true }))
        .await;
    alice.send(MessageKind::StartGame, Value::Null).await;
    let restarted = alice.recv_until(MessageKind::StartGame).await;
    assert_eq!(restarted["should_start"], true);
    let restarted_b = bob.recv_until(MessageKind::StartGame).await;
    assert_eq!(restarted_b["should_start"], true);
}

#[tokio::test]
async fn change_name_reaches_everyone() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let room_id = create_room(&mut alice, "alice").await;
    enter_room(&mut bob, &room_id, "bob").await;
    alice.expect(MessageKind::PlayerJoined).await;

    bob.send(MessageKind::ChangeName, json!({ "name": "robert" }))
        .await;
    let bob_id = bob.id.clone();
    for client in [&mut alice, &mut bob] {
        let renamed = client.expect(MessageKind::ChangeName).await;
        assert_eq!(renamed["player"], bob_id.as_str());
        assert_eq!(renamed["name"], "robert");
    }

    // The new name shows up in later snapshots.
    let mut carol = connect(&addr).await;
    let snapshot = enter_room(&mut carol, &room_id, "carol").await;
    let players = snapshot["players"].as_array().unwrap();
    let bob_entry = players
        .iter()
        .find(|p| p["client_id"] == bob.id.as_str())
        .unwrap();
    assert_eq!(bob_entry["name"], "robert");
}

#[tokio::test]
async fn a_seventh_member_is_turned_away() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let room_id = create_room(&mut alice, "alice").await;

    let mut guests = Vec::new();
    for n in 1..6 {
        let mut guest = connect(&addr).await;
        let snapshot = enter_room(&mut guest, &room_id, &format!("guest{n}")).await;
        assert_eq!(snapshot["join"], true);
        guests.push(guest);
    }

    let mut late = connect(&addr).await;
    let rejection = enter_room(&mut late, &room_id, "late").await;
    assert_eq!(rejection["join"], false);

    // Members heard about five joins and nothing more.
    for _ in 0..5 {
        alice.expect(MessageKind::PlayerJoined).await;
    }
    alice.send(MessageKind::Ready, json!({ "is_ready": true })).await;
    let next = alice.expect(MessageKind::Ready).await;
    assert_eq!(next["player"], alice.id.as_str());
}
