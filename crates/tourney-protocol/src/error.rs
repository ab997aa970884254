//! Error types for the protocol layer.

/// Errors raised while parsing commands or encoding persisted data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed or truncated input.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// An argument that should name a member is neither an id nor a
    /// mention.
    #[error("invalid member reference: {0}")]
    InvalidMemberRef(String),
}
