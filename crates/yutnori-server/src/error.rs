//! Top-level error type for the server crate.

use yutnori_protocol::ProtocolError;

/// Wraps the lower-layer errors so binaries and connection tasks deal
/// with a single type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Listener or socket error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Framing or payload error on a connection.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
