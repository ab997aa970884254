//! Names of the supporting resources and their resolved handles.

use serde::{Deserialize, Serialize};
use tourney_protocol::{ChannelId, RoleId, Tag};

/// Names used to find or create the session's channels and roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Category that holds every session channel.
    pub category: String,
    /// Operations text channel.
    pub chat: String,
    pub waiting_room: String,
    /// Lobby `n` gets the voice room `"{lobby_prefix}{n}"`.
    pub lobby_prefix: String,
    /// Lobby `n` gets the role `"{lobby_role_prefix}{n}"`.
    pub lobby_role_prefix: String,
    pub manager_role: String,
    pub participant_role: String,
    pub banned_role: String,
    /// Per-member slowmode on the operations channel.
    pub chat_cooldown_secs: u32,
    /// Existing room banned members are moved to.
    pub chill_room: Option<String>,
    /// Existing role that replaces `@everyone` as the visibility grant.
    pub verified_role: Option<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            category: "Among Us Tournament".into(),
            chat: "chat".into(),
            waiting_room: "Waiting Room".into(),
            lobby_prefix: "Lobby ".into(),
            lobby_role_prefix: "Tournament Lobby ".into(),
            manager_role: "Tournament Manager".into(),
            participant_role: "Tournament Participant".into(),
            banned_role: "Tournament Banned".into(),
            chat_cooldown_secs: 30,
            chill_room: None,
            verified_role: None,
        }
    }
}

impl LayoutConfig {
    pub fn lobby_room_name(&self, index: u32) -> String {
        format!("{}{index}", self.lobby_prefix)
    }

    pub fn lobby_role_name(&self, index: u32) -> String {
        format!("{}{index}", self.lobby_role_prefix)
    }
}

/// Handles of every supporting resource, once found or created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResources {
    pub category: ChannelId,
    /// The operations channel.
    pub chat: ChannelId,
    pub waiting_room: ChannelId,
    pub participant_role: RoleId,
    pub manager_role: RoleId,
    pub banned_role: RoleId,
    pub chill_room: Option<ChannelId>,
    pub verified_role: Option<RoleId>,
}

impl SessionResources {
    /// The role backing a non-lobby tag.
    pub fn role_for(&self, tag: Tag) -> Option<RoleId> {
        match tag {
            Tag::Participant => Some(self.participant_role),
            Tag::Manager => Some(self.manager_role),
            Tag::Banned => Some(self.banned_role),
            Tag::Lobby(_) => None,
        }
    }
}
