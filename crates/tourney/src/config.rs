//! Bot configuration loaded from TOML.
//!
//! Every section is optional; a missing key keeps its default. A
//! minimal file only needs the operators:
//!
//! ```toml
//! super_operators = [123456789]
//!
//! [layout]
//! chill_room = "AFK"
//!
//! [lobby]
//! capacity = 8
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tourney_lobby::{LobbyConfig, PresenceConfig};
use tourney_protocol::MemberId;
use tourney_session::LayoutConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Default number of channel messages scanned when replaying the backlog.
pub const DEFAULT_BACKLOG_LIMIT: usize = 10_000;

/// Top-level bot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Identities that may run operator commands without any role.
    pub super_operators: Vec<MemberId>,
    /// Run PREPARE once at startup.
    pub prepare_on_ready: bool,
    /// How far back the startup replay looks in the operations channel.
    pub backlog_limit: usize,
    pub layout: LayoutConfig,
    pub lobby: LobbyConfig,
    pub presence: PresenceConfig,
    pub roster: RosterConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            super_operators: Vec::new(),
            prepare_on_ready: true,
            backlog_limit: DEFAULT_BACKLOG_LIMIT,
            layout: LayoutConfig::default(),
            lobby: LobbyConfig::default(),
            presence: PresenceConfig::default(),
            roster: RosterConfig::default(),
        }
    }
}

/// Where the participant roster is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// JSON file holding the roster. Kept in memory when unset.
    pub path: Option<PathBuf>,
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects layouts the session cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        let names = [
            ("category", &layout.category),
            ("chat", &layout.chat),
            ("waiting_room", &layout.waiting_room),
            ("lobby_prefix", &layout.lobby_prefix),
            ("lobby_role_prefix", &layout.lobby_role_prefix),
            ("manager_role", &layout.manager_role),
            ("participant_role", &layout.participant_role),
            ("banned_role", &layout.banned_role),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("layout.{key} must not be empty")));
            }
        }

        let roles = [&layout.manager_role, &layout.participant_role, &layout.banned_role];
        for (i, a) in roles.iter().enumerate() {
            if roles[i + 1..].contains(a) {
                return Err(ConfigError::Invalid(format!("role name {a:?} is used twice")));
            }
        }
        if layout.lobby_prefix == layout.waiting_room {
            return Err(ConfigError::Invalid(
                "layout.lobby_prefix must differ from layout.waiting_room".into(),
            ));
        }
        Ok(())
    }

    pub fn is_super_operator(&self, member: MemberId) -> bool {
        self.super_operators.contains(&member)
    }
}
