//! Core identity and message types shared by every Tourney crate.
//!
//! These types describe the world as the bot sees it: who a member is,
//! where a message came from, which tags the session believes a member
//! carries, and what the platform reports about a member's voice
//! presence. None of them know how to talk to the platform.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable platform identity for a member.
///
/// Newtype wrapper around the platform's numeric id so a `MemberId`
/// can never be confused with a `ChannelId` or `RoleId`, even though
/// all three are `u64` underneath.
///
/// `#[serde(transparent)]` keeps the wire form a bare number, which is
/// also how the roster store persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl MemberId {
    /// The mention form used in reports: `<@123>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

/// Display uses the mention form so `tracing` fields and reports agree.
impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<@{}>", self.0)
    }
}

/// A text channel, voice room, or category on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A platform role. Every [`Tag`] is backed by one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub u64);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@&{}", self.0)
    }
}

/// The guild (server/space) a voice room belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// Identifier of an inbound message, used to attach reactions to it.
/// Ordered by the platform's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// A role-like marker the session applies to members.
///
/// `Lobby(n)` carries the 1-based lobby index. Lobby tags only exist
/// while lobbies are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    Participant,
    Manager,
    Banned,
    Lobby(u32),
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Participant => write!(f, "participant"),
            Self::Manager => write!(f, "manager"),
            Self::Banned => write!(f, "banned"),
            Self::Lobby(index) => write!(f, "lobby {index}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Where a message was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// A text channel in the guild.
    Channel(ChannelId),
    /// A private conversation with the given member.
    Direct(MemberId),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(channel) => write!(f, "{channel}"),
            Self::Direct(member) => write!(f, "dm:{}", member.0),
        }
    }
}

/// A message as delivered by the platform, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    pub author: MemberId,
    pub origin: Origin,
    pub content: String,
}

/// A message from the channel history, with whether the bot already
/// reacted to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricMessage {
    pub message: InboundMessage,
    pub acknowledged: bool,
}

/// Marker attached to the original message once a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    Ok,
    Failed,
}

impl Reaction {
    /// The emoji the platform attaches.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Ok => "👌",
            Self::Failed => "🖕",
        }
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Online/visibility status as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Online,
    Idle,
    DoNotDisturb,
    Invisible,
    Offline,
}

impl Status {
    /// `true` for statuses that hide whether the member is reachable.
    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Invisible | Self::Offline)
    }
}

/// The voice room a member currently occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    pub guild: GuildId,
    pub room: ChannelId,
    /// Name of the category the room sits in, if any.
    pub category: Option<String>,
}

/// Everything the eligibility classifier needs to know about a member,
/// sampled at classification time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresenceFacts {
    /// `None` when the member is not connected to any voice room.
    pub voice: Option<VoiceState>,
    /// The member's active client is a mobile one.
    pub mobile: bool,
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_mention_format() {
        assert_eq!(MemberId(42).mention(), "<@42>");
        assert_eq!(MemberId(42).to_string(), "<@42>");
    }

    #[test]
    fn test_tag_ordering_puts_lobbies_last() {
        let mut tags = vec![Tag::Lobby(2), Tag::Banned, Tag::Participant, Tag::Lobby(1)];
        tags.sort();
        assert_eq!(
            tags,
            vec![Tag::Participant, Tag::Banned, Tag::Lobby(1), Tag::Lobby(2)]
        );
    }

    #[test]
    fn test_message_id_set_orders_by_number() {
        let ids: std::collections::BTreeSet<_> = [MessageId(9), MessageId(2), MessageId(5)].into();
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec![MessageId(2), MessageId(5), MessageId(9)]
        );
    }

    #[test]
    fn test_status_hidden() {
        assert!(Status::Invisible.is_hidden());
        assert!(Status::Offline.is_hidden());
        assert!(!Status::DoNotDisturb.is_hidden());
        assert!(!Status::Online.is_hidden());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_member_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&MemberId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
