//! In-process [`Platform`] used by tests and the console demo.
//!
//! The whole guild lives in one `std::sync::Mutex`. The lock is never
//! held across an `.await`; each call sleeps for the configured latency
//! first and then applies its effect atomically.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tourney_protocol::{
    ChannelId, GuildId, HistoricMessage, MemberId, MemberRef, MessageId, Origin, Outgoing,
    PresenceFacts, Reaction, RoleId, Status, VoiceState,
};

use crate::{
    MemberProfile, Overwrite, OverwriteTarget, Platform, PlatformError, ResourceHandle,
    ResourceKind, ResourceSpec,
};

const FIRST_RESOURCE_ID: u64 = 1_000_000;

#[derive(Debug, Default)]
struct MemberRecord {
    administrator: bool,
    roles: BTreeSet<RoleId>,
    voice: Option<(GuildId, ChannelId)>,
    mobile: bool,
    status: Status,
}

#[derive(Debug)]
struct ResourceRecord {
    kind: ResourceKind,
    name: String,
    parent: Option<ChannelId>,
    overwrites: BTreeMap<OverwriteTarget, Overwrite>,
    slowmode_secs: Option<u32>,
}

#[derive(Debug, Default)]
struct World {
    next_id: u64,
    members: BTreeMap<MemberId, MemberRecord>,
    resources: BTreeMap<u64, ResourceRecord>,
    history: BTreeMap<ChannelId, Vec<HistoricMessage>>,
    missing_messages: BTreeSet<MessageId>,
    failing_moves: BTreeSet<MemberId>,
    unreachable: BTreeSet<MemberId>,
    latency: Option<Duration>,
    moves: Vec<(MemberId, ChannelId)>,
    sent: Vec<(Origin, Outgoing)>,
    reactions: Vec<(MessageId, Reaction)>,
}

impl World {
    fn allocate(&mut self) -> u64 {
        let id = self.next_id.max(FIRST_RESOURCE_ID);
        self.next_id = id + 1;
        id
    }

    fn member(&mut self, member: MemberId) -> Result<&mut MemberRecord, PlatformError> {
        self.members
            .get_mut(&member)
            .ok_or_else(|| PlatformError::NotFound(format!("member {member}")))
    }

    fn channel(&self, channel: ChannelId, kind: Option<ResourceKind>) -> Result<&ResourceRecord, PlatformError> {
        self.resources
            .get(&channel.0)
            .filter(|r| r.kind != ResourceKind::Role && kind.is_none_or(|k| r.kind == k))
            .ok_or_else(|| PlatformError::NotFound(format!("channel {channel}")))
    }

    fn role(&self, role: RoleId) -> Result<&ResourceRecord, PlatformError> {
        self.resources
            .get(&role.0)
            .filter(|r| r.kind == ResourceKind::Role)
            .ok_or_else(|| PlatformError::MissingRole(role.to_string()))
    }

    fn category_name(&self, room: ChannelId) -> Option<String> {
        let parent = self.resources.get(&room.0)?.parent?;
        self.resources.get(&parent.0).map(|p| p.name.clone())
    }

    fn find(&self, kind: ResourceKind, name: &str, parent: Option<ChannelId>) -> Option<ResourceHandle> {
        self.resources
            .iter()
            .find(|(_, r)| r.kind == kind && r.name == name && r.parent == parent)
            .map(|(id, r)| handle(*id, r.kind))
    }

    fn insert(&mut self, spec: ResourceSpec) -> ResourceHandle {
        let id = self.allocate();
        let kind = spec.kind;
        self.resources.insert(
            id,
            ResourceRecord {
                kind,
                name: spec.name,
                parent: spec.parent,
                overwrites: spec
                    .overwrites
                    .into_iter()
                    .map(|o| (o.target, o))
                    .collect(),
                slowmode_secs: spec.slowmode_secs,
            },
        );
        handle(id, kind)
    }
}

fn handle(id: u64, kind: ResourceKind) -> ResourceHandle {
    match kind {
        ResourceKind::Role => ResourceHandle::Role(RoleId(id)),
        _ => ResourceHandle::Channel(ChannelId(id)),
    }
}

/// A fake guild held entirely in memory.
///
/// ```rust
/// use tourney_platform::MemoryPlatform;
/// use tourney_protocol::{GuildId, MemberId};
///
/// let platform = MemoryPlatform::new(MemberId(1), GuildId(1));
/// let lounge = platform.add_room("Lounge", None);
/// platform.add_member(MemberId(7));
/// platform.place(MemberId(7), lounge);
/// assert_eq!(platform.room_of(MemberId(7)), Some(lounge));
/// ```
#[derive(Debug)]
pub struct MemoryPlatform {
    bot: MemberId,
    guild: GuildId,
    world: Mutex<World>,
}

impl MemoryPlatform {
    pub fn new(bot: MemberId, guild: GuildId) -> Self {
        let platform = Self {
            bot,
            guild,
            world: Mutex::new(World::default()),
        };
        platform.add_member(bot);
        platform
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        let latency = self.world().latency;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }

    // ---- seeding ----

    pub fn add_member(&self, member: MemberId) {
        self.world().members.entry(member).or_default();
    }

    pub fn add_admin(&self, member: MemberId) {
        self.world().members.entry(member).or_default().administrator = true;
    }

    /// Creates a voice room, optionally under a category that is found
    /// or created by name.
    pub fn add_room(&self, name: &str, category: Option<&str>) -> ChannelId {
        let mut world = self.world();
        let parent = category.map(|category| {
            world
                .find(ResourceKind::Category, category, None)
                .unwrap_or_else(|| world.insert(ResourceSpec::new(ResourceKind::Category, category)))
        });
        let mut spec = ResourceSpec::new(ResourceKind::VoiceChannel, name);
        spec.parent = parent.and_then(ResourceHandle::channel);
        let room = world.insert(spec);
        room.channel().unwrap_or(ChannelId(0))
    }

    /// Creates a plain text channel outside any category.
    pub fn add_text_channel(&self, name: &str) -> ChannelId {
        self.world()
            .insert(ResourceSpec::new(ResourceKind::TextChannel, name))
            .channel()
            .unwrap_or(ChannelId(0))
    }

    /// Connects a member to a room of this guild.
    pub fn place(&self, member: MemberId, room: ChannelId) {
        let guild = self.guild;
        self.world().members.entry(member).or_default().voice = Some((guild, room));
    }

    /// Connects a member to voice on another guild.
    pub fn place_elsewhere(&self, member: MemberId, guild: GuildId) {
        self.world().members.entry(member).or_default().voice = Some((guild, ChannelId(0)));
    }

    pub fn disconnect(&self, member: MemberId) {
        if let Some(record) = self.world().members.get_mut(&member) {
            record.voice = None;
        }
    }

    pub fn set_mobile(&self, member: MemberId, mobile: bool) {
        self.world().members.entry(member).or_default().mobile = mobile;
    }

    pub fn set_status(&self, member: MemberId, status: Status) {
        self.world().members.entry(member).or_default().status = status;
    }

    /// Gives a member a role directly, bypassing the session.
    pub fn grant_role(&self, member: MemberId, role: RoleId) {
        self.world().members.entry(member).or_default().roles.insert(role);
    }

    /// Appends a message to a channel's history (oldest first).
    pub fn push_history(&self, channel: ChannelId, message: HistoricMessage) {
        self.world().history.entry(channel).or_default().push(message);
    }

    // ---- failure hooks ----

    /// Every later move of `member` is rejected.
    pub fn fail_moves_for(&self, member: MemberId) {
        self.world().failing_moves.insert(member);
    }

    /// Direct messages to `member` are rejected.
    pub fn set_unreachable(&self, member: MemberId) {
        self.world().unreachable.insert(member);
    }

    /// Reacting to `message` reports it as deleted.
    pub fn forget_message(&self, message: MessageId) {
        self.world().missing_messages.insert(message);
    }

    /// Delay applied before every platform call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.world().latency = latency;
    }

    // ---- inspection ----

    pub fn moves(&self) -> Vec<(MemberId, ChannelId)> {
        self.world().moves.clone()
    }

    pub fn moves_of(&self, member: MemberId) -> Vec<ChannelId> {
        self.world()
            .moves
            .iter()
            .filter(|(m, _)| *m == member)
            .map(|(_, room)| *room)
            .collect()
    }

    pub fn sent(&self) -> Vec<(Origin, Outgoing)> {
        self.world().sent.clone()
    }

    pub fn reactions(&self) -> Vec<(MessageId, Reaction)> {
        self.world().reactions.clone()
    }

    pub fn reaction_for(&self, message: MessageId) -> Option<Reaction> {
        self.world()
            .reactions
            .iter()
            .rev()
            .find(|(m, _)| *m == message)
            .map(|(_, reaction)| *reaction)
    }

    pub fn roles_of(&self, member: MemberId) -> BTreeSet<RoleId> {
        self.world()
            .members
            .get(&member)
            .map(|r| r.roles.clone())
            .unwrap_or_default()
    }

    pub fn room_of(&self, member: MemberId) -> Option<ChannelId> {
        self.world()
            .members
            .get(&member)
            .and_then(|r| r.voice)
            .filter(|(guild, _)| *guild == self.guild)
            .map(|(_, room)| room)
    }

    /// Finds a resource by kind and name under any parent.
    pub fn lookup(&self, kind: ResourceKind, name: &str) -> Option<ResourceHandle> {
        self.world()
            .resources
            .iter()
            .find(|(_, r)| r.kind == kind && r.name == name)
            .map(|(id, r)| handle(*id, r.kind))
    }

    pub fn resource_count(&self) -> usize {
        self.world().resources.len()
    }

    pub fn overwrite(&self, channel: ChannelId, target: OverwriteTarget) -> Option<Overwrite> {
        self.world()
            .resources
            .get(&channel.0)
            .and_then(|r| r.overwrites.get(&target).cloned())
    }

    pub fn slowmode(&self, channel: ChannelId) -> Option<u32> {
        self.world()
            .resources
            .get(&channel.0)
            .and_then(|r| r.slowmode_secs)
    }

    pub fn parent_of(&self, channel: ChannelId) -> Option<ChannelId> {
        self.world().resources.get(&channel.0).and_then(|r| r.parent)
    }
}

impl Platform for MemoryPlatform {
    fn bot_id(&self) -> MemberId {
        self.bot
    }

    fn guild_id(&self) -> GuildId {
        self.guild
    }

    async fn resolve_member(&self, member: MemberRef) -> Result<Option<MemberProfile>, PlatformError> {
        self.pause().await;
        let world = self.world();
        Ok(world.members.get(&member.id()).map(|record| MemberProfile {
            id: member.id(),
            administrator: record.administrator,
            roles: record.roles.clone(),
        }))
    }

    async fn presence(&self, member: MemberId) -> Result<PresenceFacts, PlatformError> {
        self.pause().await;
        let mut world = self.world();
        let record = world.member(member)?;
        let (voice, mobile, status) = (record.voice, record.mobile, record.status);
        let voice = voice.map(|(guild, room)| VoiceState {
            guild,
            room,
            category: world.category_name(room),
        });
        Ok(PresenceFacts {
            voice,
            mobile,
            status,
        })
    }

    async fn move_member(&self, member: MemberId, room: ChannelId) -> Result<(), PlatformError> {
        self.pause().await;
        let guild = self.guild;
        let mut world = self.world();
        world.channel(room, Some(ResourceKind::VoiceChannel))?;
        let refused = world.failing_moves.contains(&member);
        let record = world.member(member)?;
        if refused {
            return Err(PlatformError::Rejected(format!("cannot move {member}")));
        }
        match record.voice {
            Some((g, _)) if g == guild => record.voice = Some((guild, room)),
            _ => {
                return Err(PlatformError::Rejected(format!(
                    "{member} is not connected to voice"
                )));
            }
        }
        world.moves.push((member, room));
        Ok(())
    }

    async fn tag_member(&self, member: MemberId, role: RoleId) -> Result<bool, PlatformError> {
        self.pause().await;
        let mut world = self.world();
        world.role(role)?;
        Ok(world.member(member)?.roles.insert(role))
    }

    async fn untag_member(&self, member: MemberId, role: RoleId) -> Result<bool, PlatformError> {
        self.pause().await;
        let mut world = self.world();
        world.role(role)?;
        Ok(world.member(member)?.roles.remove(&role))
    }

    async fn find_resource(
        &self,
        kind: ResourceKind,
        name: &str,
        parent: Option<ChannelId>,
    ) -> Result<Option<ResourceHandle>, PlatformError> {
        self.pause().await;
        Ok(self.world().find(kind, name, parent))
    }

    async fn create_resource(&self, spec: ResourceSpec) -> Result<ResourceHandle, PlatformError> {
        self.pause().await;
        let mut world = self.world();
        if let Some(parent) = spec.parent {
            world.channel(parent, Some(ResourceKind::Category))?;
        }
        Ok(world.insert(spec))
    }

    async fn delete_resource(&self, handle: ResourceHandle) -> Result<(), PlatformError> {
        self.pause().await;
        let mut world = self.world();
        match handle {
            ResourceHandle::Role(role) => {
                world.role(role)?;
                world.resources.remove(&role.0);
                for record in world.members.values_mut() {
                    record.roles.remove(&role);
                }
                for resource in world.resources.values_mut() {
                    resource.overwrites.remove(&OverwriteTarget::Role(role));
                }
            }
            ResourceHandle::Channel(channel) => {
                world.channel(channel, None)?;
                world.resources.remove(&channel.0);
                for record in world.members.values_mut() {
                    if record.voice.is_some_and(|(_, room)| room == channel) {
                        record.voice = None;
                    }
                }
                for resource in world.resources.values_mut() {
                    if resource.parent == Some(channel) {
                        resource.parent = None;
                    }
                }
            }
        }
        Ok(())
    }

    async fn set_permissions(&self, channel: ChannelId, overwrite: Overwrite) -> Result<(), PlatformError> {
        self.pause().await;
        let mut world = self.world();
        world.channel(channel, None)?;
        if let Some(resource) = world.resources.get_mut(&channel.0) {
            resource.overwrites.insert(overwrite.target, overwrite);
        }
        Ok(())
    }

    async fn permissions(
        &self,
        channel: ChannelId,
        target: OverwriteTarget,
    ) -> Result<Option<Overwrite>, PlatformError> {
        self.pause().await;
        let world = self.world();
        Ok(world.channel(channel, None)?.overwrites.get(&target).cloned())
    }

    async fn room_members(&self, room: ChannelId) -> Result<Vec<MemberId>, PlatformError> {
        self.pause().await;
        let guild = self.guild;
        let world = self.world();
        world.channel(room, Some(ResourceKind::VoiceChannel))?;
        Ok(world
            .members
            .iter()
            .filter(|(_, r)| r.voice == Some((guild, room)))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn send_message(&self, to: Origin, content: Outgoing) -> Result<(), PlatformError> {
        self.pause().await;
        let mut world = self.world();
        match to {
            Origin::Channel(channel) => {
                world.channel(channel, Some(ResourceKind::TextChannel))?;
            }
            Origin::Direct(member) => {
                if !world.members.contains_key(&member) {
                    return Err(PlatformError::NotFound(format!("member {member}")));
                }
                if world.unreachable.contains(&member) {
                    return Err(PlatformError::Rejected(format!(
                        "{member} does not accept direct messages"
                    )));
                }
            }
        }
        world.sent.push((to, content));
        Ok(())
    }

    async fn react(&self, _at: Origin, message: MessageId, reaction: Reaction) -> Result<(), PlatformError> {
        self.pause().await;
        let mut world = self.world();
        if world.missing_messages.contains(&message) {
            return Err(PlatformError::NotFound(format!("message {message}")));
        }
        world.reactions.push((message, reaction));
        Ok(())
    }

    async fn history(&self, channel: ChannelId, limit: usize) -> Result<Vec<HistoricMessage>, PlatformError> {
        self.pause().await;
        let world = self.world();
        Ok(world
            .history
            .get(&channel)
            .map(|messages| messages.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
