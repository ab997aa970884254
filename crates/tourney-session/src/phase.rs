//! Session lifecycle phases.

use serde::{Deserialize, Serialize};

/// Where the session is in its lifecycle.
///
/// ```text
/// Unprepared ──prepare──→ Prepared ──start──→ LobbyActive
///      ↑                   │    ↑                │
///      └───────clean───────┘    └──────end───────┘
/// ```
///
/// `clean` returns to `Unprepared` from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Unprepared,
    Prepared,
    LobbyActive,
}

impl SessionPhase {
    /// Supporting channels and roles exist.
    pub fn is_prepared(self) -> bool {
        self >= Self::Prepared
    }

    pub fn is_lobby_active(self) -> bool {
        self == Self::LobbyActive
    }

    /// Returns `true` if moving to `target` is a valid lifecycle step.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Unprepared, Self::Prepared)
                | (Self::Prepared, Self::LobbyActive)
                | (Self::LobbyActive, Self::Prepared)
                | (_, Self::Unprepared)
        )
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unprepared => write!(f, "UNPREPARED"),
            Self::Prepared => write!(f, "PREPARED"),
            Self::LobbyActive => write!(f, "LOBBY_ACTIVE"),
        }
    }
}
