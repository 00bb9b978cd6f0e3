//! Length-delimited frame I/O.
//!
//! Every message is `[kind u8][payload_len u16 big-endian][payload]`.
//! There is no framing magic and no checksum; the TCP stream is
//! trusted. Reads and writes retry timeout-class errors and surface
//! everything else, which ends the connection.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;
use crate::message::MessageKind;

/// Bytes in a frame header.
pub const HEADER_LEN: usize = 3;

/// Largest payload the 16-bit length field can carry.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// One complete message as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Encodes a header and payload into wire bytes.
    pub fn encode(kind: MessageKind, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.push(kind as u8);
        bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
        Ok(bytes)
    }

    /// Parses exactly one frame from a byte slice.
    ///
    /// The slice must contain the whole frame and nothing else; this is
    /// the in-memory counterpart of [`read_frame`] used where messages
    /// arrive as discrete buffers (queues, tests).
    pub fn parse(bytes: &[u8]) -> Result<Frame, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(truncated());
        }
        let kind = MessageKind::try_from(bytes[0])?;
        let len = usize::from(u16::from_be_bytes([bytes[1], bytes[2]]));
        if bytes.len() != HEADER_LEN + len {
            return Err(truncated());
        }
        Ok(Frame {
            kind,
            payload: bytes[HEADER_LEN..].to_vec(),
        })
    }
}

fn truncated() -> ProtocolError {
    ProtocolError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "frame does not match its length header",
    ))
}

fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::Interrupted
    )
}

async fn read_exact_retry<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.read_exact(buf).await {
            Ok(_) => return Ok(()),
            Err(e) if is_transient(&e) => continue,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
}

/// Reads exactly one frame: 3 header bytes, then the payload.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    read_exact_retry(reader, &mut header).await?;
    let kind = MessageKind::try_from(header[0])?;
    let len = usize::from(u16::from_be_bytes([header[1], header[2]]));
    let mut payload = vec![0u8; len];
    if len > 0 {
        read_exact_retry(reader, &mut payload).await?;
    }
    Ok(Frame { kind, payload })
}

/// Writes pre-encoded frame bytes, retrying timeout-class errors.
///
/// Callers keep one writer per connection, which makes each logical
/// message atomic with respect to other senders.
pub async fn write_frame<W>(writer: &mut W, bytes: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match writer.write_all(bytes).await {
            Ok(()) => break,
            Err(e) if is_transient(&e) => continue,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
    writer.flush().await.map_err(ProtocolError::Io)
}
