//! Identity types and addressing.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters a generated identifier may contain (the RFC 4648 base32
/// alphabet, which is what 20 random bytes base32-encode to).
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Length of a generated identifier: 20 random bytes, base32, no padding.
pub const ID_LEN: usize = 32;

fn generate_id(rng: &mut impl Rng) -> String {
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// An opaque identifier for a connected client.
///
/// Minted by the hub when a connection is accepted and sent to the
/// client in the `Connect` handshake. Serializes as a bare string.
/// The default (empty) value stands for "no client" in payloads such
/// as a `PlayerLeft` for the last member of a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Mints a fresh identifier.
    pub fn generate(rng: &mut impl Rng) -> Self {
        Self(generate_id(rng))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque identifier for a room, minted on room creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Mints a fresh identifier.
    pub fn generate(rng: &mut impl Rng) -> Self {
        Self(generate_id(rng))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One member in the room snapshot sent to a joining client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub client_id: ClientId,
    pub name: String,
    pub is_ready: bool,
}

/// Who should receive a server event produced by the room or game.
///
/// Room handlers return `(Recipient, ServerEvent)` pairs; the actor
/// serializes each event once and fans the bytes out accordingly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every current member of the room.
    All,
    /// One specific client.
    Player(ClientId),
    /// Every member except the named client.
    AllExcept(ClientId),
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn generated_ids_have_the_wire_format() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = ClientId::generate(&mut rng);
        assert_eq!(id.as_str().len(), ID_LEN);
        assert!(id
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b)));
    }

    #[test]
    fn generated_ids_differ() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = RoomId::generate(&mut rng);
        let b = RoomId::generate(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn client_id_serializes_as_plain_string() {
        let id = ClientId("ABC234".into());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ABC234\"");
        let back: ClientId = serde_json::from_str("\"ABC234\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn player_entry_round_trips() {
        let entry = PlayerEntry {
            client_id: ClientId("X".into()),
            name: "alice".into(),
            is_ready: true,
        };
        let bytes = serde_json::to_vec(&entry).unwrap();
        let back: PlayerEntry = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, entry);
    }
}
