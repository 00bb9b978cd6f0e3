//! Error types for the protocol layer.

/// Errors that can occur while framing, encoding, or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Reading or writing the underlying stream failed for good —
    /// timeout-class errors are retried before this surfaces.
    #[error("stream i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Payload serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Payload deserialization failed: malformed JSON, missing fields,
    /// or values outside their domain (e.g. a cell ordinal over 28).
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame header names a kind this protocol does not define.
    #[error("unknown message kind {0}")]
    UnknownKind(u8),

    /// The payload does not fit the 16-bit length field.
    #[error("payload of {0} bytes exceeds the frame limit")]
    PayloadTooLarge(usize),
}
