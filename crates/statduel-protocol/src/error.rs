//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// Anything that fails here happened *before* room or session logic ran,
/// so a protocol error never mutates game state — the offending message
/// is dropped or answered with an error event.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed — malformed JSON, missing fields, or a
    /// message that doesn't match any known intent/event shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates a protocol rule (e.g. an event
    /// arriving on the client→server direction).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
