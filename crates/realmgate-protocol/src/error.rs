//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown message `type`.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but is not allowed where it arrived,
    /// e.g. a `Call` before the session was welcomed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
