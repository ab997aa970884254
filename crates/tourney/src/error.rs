//! Unified error type for the Tourney bot.

use tourney_platform::PlatformError;
use tourney_protocol::ProtocolError;
use tourney_session::SessionError;

use crate::ConfigError;
use crate::rules::CommandKind;

/// Top-level error that wraps all crate-specific errors.
///
/// Command handlers return this; the dispatcher turns any of them into
/// the failure reaction and an `error!` line.
#[derive(Debug, thiserror::Error)]
pub enum TourneyError {
    /// A command argument or persisted payload could not be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The platform or roster store refused a request.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The session was in the wrong phase, or a collaborator failed
    /// during a lifecycle step.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A matched command reached a handler that does not take its
    /// arguments, or does not run it at all.
    #[error("{0} was routed with arguments it does not take")]
    Misrouted(CommandKind),
}

impl TourneyError {
    /// `true` when the command was valid but the session state did not
    /// allow it.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::Session(e) if e.is_state_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_protocol::MemberId;

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMemberRef("abc".into());
        let tourney_err: TourneyError = err.into();
        assert!(matches!(tourney_err, TourneyError::Protocol(_)));
        assert!(tourney_err.to_string().contains("abc"));
    }

    #[test]
    fn test_from_platform_error() {
        let err = PlatformError::Rejected("no voice".into());
        let tourney_err: TourneyError = err.into();
        assert!(matches!(tourney_err, TourneyError::Platform(_)));
        assert!(!tourney_err.is_state_error());
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotParticipant(MemberId(3));
        let tourney_err: TourneyError = err.into();
        assert!(matches!(tourney_err, TourneyError::Session(_)));
        assert!(tourney_err.is_state_error());
    }

    #[test]
    fn test_wrapped_platform_failure_is_not_state_error() {
        let err = SessionError::Platform(PlatformError::Unavailable);
        let tourney_err: TourneyError = err.into();
        assert!(!tourney_err.is_state_error());
    }

    #[test]
    fn test_misrouted_is_failure_not_state_error() {
        let err = TourneyError::Misrouted(CommandKind::Assign);
        assert!(!err.is_state_error());
        assert!(err.to_string().starts_with("ASSIGN"));
    }

    #[test]
    fn test_from_config_error() {
        let err = ConfigError::Invalid("empty".into());
        let tourney_err: TourneyError = err.into();
        assert!(matches!(tourney_err, TourneyError::Config(_)));
    }
}
