//! Error types for the session layer.

use tourney_platform::PlatformError;
use tourney_protocol::MemberId;

/// Errors raised by session lifecycle and roster operations.
///
/// Every variant except [`SessionError::Platform`] is a state error:
/// the command was valid but the session was in the wrong phase or the
/// member in the wrong state. State is left unchanged in that case.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The supporting resources have not been prepared.
    #[error("session is not prepared")]
    NotPrepared,

    /// Lobbies already exist; end them first.
    #[error("lobbies are already active")]
    LobbiesActive,

    /// The command needs active lobbies.
    #[error("lobbies are not active")]
    LobbiesInactive,

    #[error("{0} is not a participant")]
    NotParticipant(MemberId),

    #[error("lobby {0} does not exist")]
    NoSuchLobby(u32),

    /// A platform or roster store call failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl SessionError {
    /// `true` for phase and membership errors, `false` for collaborator
    /// failures.
    pub fn is_state_error(&self) -> bool {
        !matches!(self, Self::Platform(_))
    }
}
