//! Platform abstraction layer for Tourney.
//!
//! The session never talks to the chat service directly. It goes
//! through the [`Platform`] trait (members, rooms, roles, messages) and
//! the [`RosterStore`] trait (persisted participant ids). Production
//! code plugs a real client in; tests and the console demo use the
//! in-memory implementations.
//!
//! # Feature Flags
//!
//! - `memory` (default): [`MemoryPlatform`] and [`MemoryRoster`]

mod error;
#[cfg(feature = "memory")]
mod memory;
mod roster;

pub use error::PlatformError;
#[cfg(feature = "memory")]
pub use memory::MemoryPlatform;
#[cfg(feature = "memory")]
pub use roster::MemoryRoster;
pub use roster::JsonFileRoster;

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tourney_protocol::{
    ChannelId, GuildId, HistoricMessage, InboundMessage, MemberId, MemberRef, MessageId, Origin,
    Outgoing, PresenceFacts, Reaction, RoleId,
};

// ---------------------------------------------------------------------------
// Members and resources
// ---------------------------------------------------------------------------

/// What the platform knows about a resolved member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub id: MemberId,
    /// Holds the platform's administrator permission.
    pub administrator: bool,
    pub roles: BTreeSet<RoleId>,
}

impl MemberProfile {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// Kind of a platform object the session creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Role,
    Category,
    TextChannel,
    VoiceChannel,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Role => "role",
            Self::Category => "category",
            Self::TextChannel => "text channel",
            Self::VoiceChannel => "voice channel",
        };
        f.write_str(name)
    }
}

/// Handle to a created or found resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceHandle {
    Role(RoleId),
    Channel(ChannelId),
}

impl ResourceHandle {
    pub fn role(self) -> Option<RoleId> {
        match self {
            Self::Role(role) => Some(role),
            Self::Channel(_) => None,
        }
    }

    pub fn channel(self) -> Option<ChannelId> {
        match self {
            Self::Channel(channel) => Some(channel),
            Self::Role(_) => None,
        }
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "{role}"),
            Self::Channel(channel) => write!(f, "{channel}"),
        }
    }
}

/// A single permission bit the session toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    View,
    SendMessages,
    Connect,
    Speak,
    ManageMessages,
}

/// Who a permission overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverwriteTarget {
    Everyone,
    Role(RoleId),
    Member(MemberId),
}

/// Explicit allow/deny bits for one target on one channel. Bits in
/// neither set are inherited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite {
    pub target: OverwriteTarget,
    pub allow: BTreeSet<Permission>,
    pub deny: BTreeSet<Permission>,
}

impl Overwrite {
    pub fn new(target: OverwriteTarget) -> Self {
        Self {
            target,
            allow: BTreeSet::new(),
            deny: BTreeSet::new(),
        }
    }

    pub fn allow(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        for permission in permissions {
            self.deny.remove(&permission);
            self.allow.insert(permission);
        }
        self
    }

    pub fn deny(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        for permission in permissions {
            self.allow.remove(&permission);
            self.deny.insert(permission);
        }
        self
    }

    /// The same overwrite with its allow part dropped.
    pub fn deny_only(mut self) -> Self {
        self.allow.clear();
        self
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.allow.contains(&permission)
    }

    pub fn denies(&self, permission: Permission) -> bool {
        self.deny.contains(&permission)
    }
}

/// Everything needed to create a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub name: String,
    /// Parent category for channels.
    pub parent: Option<ChannelId>,
    pub overwrites: Vec<Overwrite>,
    /// Per-member message cooldown for text channels.
    pub slowmode_secs: Option<u32>,
}

impl ResourceSpec {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: None,
            overwrites: Vec::new(),
            slowmode_secs: None,
        }
    }

    pub fn under(mut self, parent: ChannelId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_overwrites(mut self, overwrites: Vec<Overwrite>) -> Self {
        self.overwrites = overwrites;
        self
    }

    pub fn with_slowmode(mut self, secs: u32) -> Self {
        self.slowmode_secs = Some(secs);
        self
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Something the platform pushes to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    Message(InboundMessage),
    /// A member changed voice room. `None` means disconnected.
    VoiceMoved {
        member: MemberId,
        from: Option<ChannelId>,
        to: Option<ChannelId>,
    },
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The chat service as seen by the session.
///
/// Every call may suspend on network I/O. Implementations must be
/// shareable across tasks; the bot holds one behind an `Arc`.
pub trait Platform: Send + Sync + 'static {
    /// The bot's own identity, used to ignore its own messages.
    fn bot_id(&self) -> MemberId;

    /// The guild the session runs in.
    fn guild_id(&self) -> GuildId;

    /// Looks a member up. `Ok(None)` when no such member exists.
    fn resolve_member(
        &self,
        member: MemberRef,
    ) -> impl Future<Output = Result<Option<MemberProfile>, PlatformError>> + Send;

    /// Samples the member's current voice presence.
    fn presence(
        &self,
        member: MemberId,
    ) -> impl Future<Output = Result<PresenceFacts, PlatformError>> + Send;

    /// Moves a connected member to another voice room.
    fn move_member(
        &self,
        member: MemberId,
        room: ChannelId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Applies a role. Returns `false` if the member already had it.
    fn tag_member(
        &self,
        member: MemberId,
        role: RoleId,
    ) -> impl Future<Output = Result<bool, PlatformError>> + Send;

    /// Removes a role. Returns `false` if the member did not have it.
    fn untag_member(
        &self,
        member: MemberId,
        role: RoleId,
    ) -> impl Future<Output = Result<bool, PlatformError>> + Send;

    /// Finds an existing resource by kind, name and parent category.
    fn find_resource(
        &self,
        kind: ResourceKind,
        name: &str,
        parent: Option<ChannelId>,
    ) -> impl Future<Output = Result<Option<ResourceHandle>, PlatformError>> + Send;

    fn create_resource(
        &self,
        spec: ResourceSpec,
    ) -> impl Future<Output = Result<ResourceHandle, PlatformError>> + Send;

    /// Deletes a resource. Members still in a deleted voice room are
    /// disconnected.
    fn delete_resource(
        &self,
        handle: ResourceHandle,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Replaces the overwrite for `overwrite.target` on `channel`.
    fn set_permissions(
        &self,
        channel: ChannelId,
        overwrite: Overwrite,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Reads the overwrite for `target` on `channel`, if any.
    fn permissions(
        &self,
        channel: ChannelId,
        target: OverwriteTarget,
    ) -> impl Future<Output = Result<Option<Overwrite>, PlatformError>> + Send;

    /// Members currently connected to a voice room.
    fn room_members(
        &self,
        room: ChannelId,
    ) -> impl Future<Output = Result<Vec<MemberId>, PlatformError>> + Send;

    /// Posts to a channel or a member's private conversation.
    fn send_message(
        &self,
        to: Origin,
        content: Outgoing,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Attaches a reaction marker to a message.
    ///
    /// Returns [`PlatformError::NotFound`] when the message is gone.
    fn react(
        &self,
        at: Origin,
        message: MessageId,
        reaction: Reaction,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Recent messages of a channel, newest first.
    fn history(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<HistoricMessage>, PlatformError>> + Send;
}

/// A shared platform, so a driver can keep a handle while the bot owns
/// another.
impl<P: Platform> Platform for Arc<P> {
    fn bot_id(&self) -> MemberId {
        (**self).bot_id()
    }

    fn guild_id(&self) -> GuildId {
        (**self).guild_id()
    }

    fn resolve_member(
        &self,
        member: MemberRef,
    ) -> impl Future<Output = Result<Option<MemberProfile>, PlatformError>> + Send {
        (**self).resolve_member(member)
    }

    fn presence(
        &self,
        member: MemberId,
    ) -> impl Future<Output = Result<PresenceFacts, PlatformError>> + Send {
        (**self).presence(member)
    }

    fn move_member(
        &self,
        member: MemberId,
        room: ChannelId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send {
        (**self).move_member(member, room)
    }

    fn tag_member(
        &self,
        member: MemberId,
        role: RoleId,
    ) -> impl Future<Output = Result<bool, PlatformError>> + Send {
        (**self).tag_member(member, role)
    }

    fn untag_member(
        &self,
        member: MemberId,
        role: RoleId,
    ) -> impl Future<Output = Result<bool, PlatformError>> + Send {
        (**self).untag_member(member, role)
    }

    fn find_resource(
        &self,
        kind: ResourceKind,
        name: &str,
        parent: Option<ChannelId>,
    ) -> impl Future<Output = Result<Option<ResourceHandle>, PlatformError>> + Send {
        (**self).find_resource(kind, name, parent)
    }

    fn create_resource(
        &self,
        spec: ResourceSpec,
    ) -> impl Future<Output = Result<ResourceHandle, PlatformError>> + Send {
        (**self).create_resource(spec)
    }

    fn delete_resource(
        &self,
        handle: ResourceHandle,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send {
        (**self).delete_resource(handle)
    }

    fn set_permissions(
        &self,
        channel: ChannelId,
        overwrite: Overwrite,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send {
        (**self).set_permissions(channel, overwrite)
    }

    fn permissions(
        &self,
        channel: ChannelId,
        target: OverwriteTarget,
    ) -> impl Future<Output = Result<Option<Overwrite>, PlatformError>> + Send {
        (**self).permissions(channel, target)
    }

    fn room_members(
        &self,
        room: ChannelId,
    ) -> impl Future<Output = Result<Vec<MemberId>, PlatformError>> + Send {
        (**self).room_members(room)
    }

    fn send_message(
        &self,
        to: Origin,
        content: Outgoing,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send {
        (**self).send_message(to, content)
    }

    fn react(
        &self,
        at: Origin,
        message: MessageId,
        reaction: Reaction,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send {
        (**self).react(at, message, reaction)
    }

    fn history(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<HistoricMessage>, PlatformError>> + Send {
        (**self).history(channel, limit)
    }
}

/// Persisted set of participant ids.
pub trait RosterStore: Send + Sync + 'static {
    fn put(&self, member: MemberId) -> impl Future<Output = Result<(), PlatformError>> + Send;

    fn delete(&self, member: MemberId) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Every stored id, in ascending order.
    fn list(&self) -> impl Future<Output = Result<Vec<MemberId>, PlatformError>> + Send;

    /// Removes every stored id.
    fn clear(&self) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_allow_then_deny_moves_bit() {
        let overwrite = Overwrite::new(OverwriteTarget::Everyone)
            .allow([Permission::Speak, Permission::View])
            .deny([Permission::Speak]);
        assert!(overwrite.allows(Permission::View));
        assert!(overwrite.denies(Permission::Speak));
        assert!(!overwrite.allows(Permission::Speak));
    }

    #[test]
    fn test_deny_only_drops_allow_part() {
        let overwrite = Overwrite::new(OverwriteTarget::Everyone)
            .allow([Permission::View])
            .deny([Permission::SendMessages])
            .deny_only();
        assert!(overwrite.allow.is_empty());
        assert!(overwrite.denies(Permission::SendMessages));
    }

    #[test]
    fn test_resource_handle_accessors() {
        assert_eq!(ResourceHandle::Role(RoleId(3)).role(), Some(RoleId(3)));
        assert_eq!(ResourceHandle::Role(RoleId(3)).channel(), None);
        assert_eq!(ResourceHandle::Channel(ChannelId(4)).channel(), Some(ChannelId(4)));
    }
}
