use tourney_protocol::ProtocolError;

/// Errors reported by the chat platform or the roster store.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// A member, channel, role or message does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A supporting role has not been created or resolved yet.
    #[error("missing role: {0}")]
    MissingRole(String),

    /// The platform refused the request (permissions, member left voice, ...).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The platform could not be reached.
    #[error("platform unavailable")]
    Unavailable,

    /// Reading or writing the persisted roster failed.
    #[error("roster i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted roster could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] ProtocolError),
}
