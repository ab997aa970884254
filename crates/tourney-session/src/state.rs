//! The tournament session: phase, roster, tags and lobbies.
//!
//! [`SessionState`] is the only shared mutable value of the bot. It is
//! kept behind a [`SessionLock`](crate::SessionLock); every method that
//! takes `&mut self` is meant to run under the write side, the `&self`
//! accessors under either side.
//!
//! Tags are side effects requested from the [`Platform`]. The state
//! records a tag as applied only after the platform confirmed it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::watch;
use tourney_lobby::Partition;
use tourney_platform::{
    Platform, PlatformError, ResourceHandle, ResourceKind, ResourceSpec, RosterStore,
};
use tourney_protocol::{ChannelId, MemberId, RoleId};

use crate::permissions::{self, OverwriteRoles};
use crate::{LayoutConfig, SessionError, SessionPhase, SessionResources};

/// Receiving end of the published resource handles.
pub type ResourceWatch = watch::Receiver<Option<Arc<SessionResources>>>;

// ---------------------------------------------------------------------------
// Lobbies
// ---------------------------------------------------------------------------

/// One created lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    pub room: ChannelId,
    pub role: RoleId,
    /// Members placed here when the lobbies were created.
    pub members: Vec<MemberId>,
}

/// The lobbies created by one START, keyed by 1-based index.
///
/// Built whole when lobbies start and dropped whole when they end.
/// Later reassignments are tracked as lobby tags, not patched in here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyAssignment {
    lobbies: BTreeMap<u32, Lobby>,
}

impl LobbyAssignment {
    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&Lobby> {
        self.lobbies.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Lobby)> {
        self.lobbies.iter().map(|(index, lobby)| (*index, lobby))
    }

    /// Index of the lobby whose voice room is `room`.
    pub fn index_of_room(&self, room: ChannelId) -> Option<u32> {
        self.iter()
            .find(|(_, lobby)| lobby.room == room)
            .map(|(index, _)| index)
    }

    /// Lobby a member was placed in at creation time.
    pub fn placed_in(&self, member: MemberId) -> Option<u32> {
        self.iter()
            .find(|(_, lobby)| lobby.members.contains(&member))
            .map(|(index, _)| index)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SessionState {
    layout: LayoutConfig,
    phase: SessionPhase,
    resources: Option<SessionResources>,
    participants: BTreeSet<MemberId>,
    managers: BTreeSet<MemberId>,
    banned: BTreeSet<MemberId>,
    assignment: Option<LobbyAssignment>,
    /// Live lobby tags: member to lobby index.
    lobby_tags: BTreeMap<MemberId, u32>,
    published: watch::Sender<Option<Arc<SessionResources>>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl SessionState {
    pub fn new(layout: LayoutConfig) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            layout,
            phase: SessionPhase::Unprepared,
            resources: None,
            participants: BTreeSet::new(),
            managers: BTreeSet::new(),
            banned: BTreeSet::new(),
            assignment: None,
            lobby_tags: BTreeMap::new(),
            published,
        }
    }

    // ---- accessors ----

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_lobby_phase(&self) -> bool {
        self.phase.is_lobby_active()
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn resources(&self) -> Option<&SessionResources> {
        self.resources.as_ref()
    }

    pub fn participants(&self) -> &BTreeSet<MemberId> {
        &self.participants
    }

    pub fn managers(&self) -> &BTreeSet<MemberId> {
        &self.managers
    }

    pub fn banned(&self) -> &BTreeSet<MemberId> {
        &self.banned
    }

    pub fn is_participant(&self, member: MemberId) -> bool {
        self.participants.contains(&member)
    }

    pub fn is_banned(&self, member: MemberId) -> bool {
        self.banned.contains(&member)
    }

    pub fn assignment(&self) -> Option<&LobbyAssignment> {
        self.assignment.as_ref()
    }

    /// Lobby index currently tagged on `member`.
    pub fn lobby_of(&self, member: MemberId) -> Option<u32> {
        self.lobby_tags.get(&member).copied()
    }

    /// Rooms of the active lobbies.
    pub fn lobby_rooms(&self) -> BTreeSet<ChannelId> {
        self.assignment
            .iter()
            .flat_map(|a| a.iter().map(|(_, lobby)| lobby.room))
            .collect()
    }

    /// A receiver that sees resource handles whenever they change,
    /// without taking the session lock.
    pub fn subscribe(&self) -> ResourceWatch {
        self.published.subscribe()
    }

    fn prepared(&self) -> Result<&SessionResources, SessionError> {
        match (&self.resources, self.phase.is_prepared()) {
            (Some(resources), true) => Ok(resources),
            _ => Err(SessionError::NotPrepared),
        }
    }

    fn install(&mut self, resources: SessionResources) {
        self.published.send_replace(Some(Arc::new(resources.clone())));
        self.resources = Some(resources);
        if self.phase == SessionPhase::Unprepared {
            self.phase = SessionPhase::Prepared;
        }
    }

    // ---- lifecycle ----

    /// Looks up already existing supporting resources. Creates nothing.
    ///
    /// Returns `true` when everything required was found; the session is
    /// then `Prepared`, or `LobbyActive` if lobbies from an earlier run
    /// are still standing. Returns `false` and changes nothing otherwise.
    ///
    /// Manager, banned and lobby tags already carried by restored
    /// participants are picked back up.
    pub async fn resolve<P: Platform>(&mut self, platform: &P) -> Result<bool, SessionError> {
        if self.phase.is_prepared() {
            return Ok(true);
        }
        let Some(resources) = lookup(platform, &self.layout).await? else {
            tracing::debug!("supporting resources not found");
            return Ok(false);
        };
        tracing::info!(chat = %resources.chat, "session resources resolved");
        let category = resources.category;
        self.install(resources);
        self.retag_participants(platform).await;
        let lobbies = discover_lobbies(platform, &self.layout, category).await?;
        self.recover_tags(platform, lobbies).await;
        Ok(true)
    }

    /// Finds or creates every supporting resource and enters `Prepared`.
    ///
    /// A no-op returning `false` when already prepared.
    pub async fn prepare<P: Platform>(&mut self, platform: &P) -> Result<bool, SessionError> {
        if self.phase.is_prepared() {
            return Ok(false);
        }
        let layout = &self.layout;

        let participant_role = ensure_role(platform, &layout.participant_role).await?;
        let manager_role = ensure_role(platform, &layout.manager_role).await?;
        let banned_role = ensure_role(platform, &layout.banned_role).await?;
        let (chill_room, verified_role) = optional_resources(platform, layout).await?;

        let roles = OverwriteRoles {
            participant: participant_role,
            manager: manager_role,
            banned: banned_role,
            verified: verified_role,
        };
        let category = ensure_channel(
            platform,
            ResourceSpec::new(ResourceKind::Category, &layout.category)
                .with_overwrites(permissions::category_overwrites(&roles)),
        )
        .await?;
        let chat = ensure_channel(
            platform,
            ResourceSpec::new(ResourceKind::TextChannel, &layout.chat)
                .under(category)
                .with_overwrites(permissions::chat_overwrites(&roles))
                .with_slowmode(layout.chat_cooldown_secs),
        )
        .await?;
        let waiting_room = ensure_channel(
            platform,
            ResourceSpec::new(ResourceKind::VoiceChannel, &layout.waiting_room)
                .under(category)
                .with_overwrites(permissions::waiting_room_overwrites(&roles)),
        )
        .await?;

        self.install(SessionResources {
            category,
            chat,
            waiting_room,
            participant_role,
            manager_role,
            banned_role,
            chill_room,
            verified_role,
        });
        self.retag_participants(platform).await;
        tracing::info!(%chat, %waiting_room, "session prepared");
        Ok(true)
    }

    /// Tears down every session resource, wipes the roster and returns
    /// to `Unprepared`. Individual failures are logged, never returned.
    ///
    /// Members still sitting in a session voice room are moved to the
    /// chill room first when one is configured.
    pub async fn clean<P: Platform, R: RosterStore>(&mut self, platform: &P, roster: &R) {
        let mut doomed = Vec::new();
        if let Some(assignment) = self.assignment.take() {
            for (_, lobby) in assignment.lobbies {
                doomed.push(ResourceHandle::Channel(lobby.room));
                doomed.push(ResourceHandle::Role(lobby.role));
            }
        }
        let chill_room = match self.resources.take() {
            Some(r) => {
                doomed.extend([
                    ResourceHandle::Channel(r.waiting_room),
                    ResourceHandle::Channel(r.chat),
                    ResourceHandle::Channel(r.category),
                    ResourceHandle::Role(r.participant_role),
                    ResourceHandle::Role(r.manager_role),
                    ResourceHandle::Role(r.banned_role),
                ]);
                r.chill_room
            }
            None => {
                doomed.extend(leftovers(platform, &self.layout).await);
                optional_resources(platform, &self.layout)
                    .await
                    .ok()
                    .and_then(|(chill_room, _)| chill_room)
            }
        };
        for handle in doomed {
            if let (ResourceHandle::Channel(room), Some(chill_room)) = (handle, chill_room) {
                evacuate(platform, room, chill_room).await;
            }
            delete_logged(platform, handle).await;
        }
        if let Err(e) = roster.clear().await {
            tracing::warn!(error = %e, "failed to wipe persisted roster");
        }

        self.participants.clear();
        self.managers.clear();
        self.banned.clear();
        self.lobby_tags.clear();
        self.phase = SessionPhase::Unprepared;
        self.published.send_replace(None);
        tracing::info!("session cleaned");
    }

    /// Creates one room and one role per lobby of `partition` and tags
    /// the placed members.
    ///
    /// Fails without changing anything unless the phase is `Prepared`.
    /// If creating a lobby fails, the lobbies created so far are deleted
    /// and the error is returned. Members whose lobby tag could not be
    /// applied are returned with the platform error.
    pub async fn start_lobbies<P: Platform>(
        &mut self,
        platform: &P,
        partition: Partition,
    ) -> Result<Vec<(MemberId, PlatformError)>, SessionError> {
        match self.phase {
            SessionPhase::Unprepared => return Err(SessionError::NotPrepared),
            SessionPhase::LobbyActive => return Err(SessionError::LobbiesActive),
            SessionPhase::Prepared => {}
        }
        let resources = self.prepared()?.clone();

        let mut created = Vec::new();
        let mut lobbies = BTreeMap::new();
        for (index, members) in partition.into_lobbies() {
            let role = match create_role(platform, self.layout.lobby_role_name(index)).await {
                Ok(role) => role,
                Err(e) => return Err(rollback(platform, created, e).await),
            };
            created.push(ResourceHandle::Role(role));

            let spec = ResourceSpec::new(ResourceKind::VoiceChannel, self.layout.lobby_room_name(index))
                .under(resources.category)
                .with_overwrites(permissions::lobby_overwrites(role, resources.manager_role));
            let room = match create_channel(platform, spec).await {
                Ok(room) => room,
                Err(e) => return Err(rollback(platform, created, e).await),
            };
            created.push(ResourceHandle::Channel(room));
            lobbies.insert(index, Lobby { room, role, members });
        }

        let mut untagged = Vec::new();
        let mut lobby_tags = BTreeMap::new();
        for (index, lobby) in &lobbies {
            for member in &lobby.members {
                match platform.tag_member(*member, lobby.role).await {
                    Ok(_) => {
                        lobby_tags.insert(*member, *index);
                    }
                    Err(e) => {
                        tracing::warn!(%member, lobby = index, error = %e, "failed to apply lobby tag");
                        untagged.push((*member, e));
                    }
                }
            }
        }

        tracing::info!(lobbies = lobbies.len(), tagged = lobby_tags.len(), "lobbies started");
        self.assignment = Some(LobbyAssignment { lobbies });
        self.lobby_tags = lobby_tags;
        self.phase = SessionPhase::LobbyActive;
        Ok(untagged)
    }

    /// Moves everyone out of the lobby rooms into the waiting room and
    /// deletes the lobbies. Returns how many members were moved out.
    pub async fn end_lobbies<P: Platform>(&mut self, platform: &P) -> Result<usize, SessionError> {
        if !self.phase.is_lobby_active() {
            return Err(SessionError::LobbiesInactive);
        }
        let waiting_room = self.prepared()?.waiting_room;
        let assignment = self.assignment.take().unwrap_or_default();

        let mut evacuated = 0;
        for (_, lobby) in assignment.lobbies {
            evacuated += evacuate(platform, lobby.room, waiting_room).await;
            delete_logged(platform, ResourceHandle::Channel(lobby.room)).await;
            delete_logged(platform, ResourceHandle::Role(lobby.role)).await;
        }

        self.lobby_tags.clear();
        self.phase = SessionPhase::Prepared;
        tracing::info!(evacuated, "lobbies ended");
        Ok(evacuated)
    }

    // ---- roster ----

    /// Loads the persisted roster as the participant set.
    pub async fn restore_roster<R: RosterStore>(&mut self, roster: &R) -> Result<usize, SessionError> {
        let ids = roster.list().await?;
        let restored = ids.len();
        self.participants.extend(ids);
        Ok(restored)
    }

    /// Tags `member` as a participant and persists it.
    ///
    /// Returns `false` if the member already participates or is banned.
    pub async fn add_participant<P: Platform, R: RosterStore>(
        &mut self,
        platform: &P,
        roster: &R,
        member: MemberId,
    ) -> Result<bool, SessionError> {
        let (role, banned_role) = {
            let resources = self.prepared()?;
            (resources.participant_role, resources.banned_role)
        };
        if self.participants.contains(&member) || self.carries_ban(platform, member, banned_role).await? {
            return Ok(false);
        }
        platform.tag_member(member, role).await?;
        if let Err(e) = roster.put(member).await {
            if let Err(undo) = platform.untag_member(member, role).await {
                tracing::warn!(%member, error = %undo, "failed to undo participant tag");
            }
            return Err(e.into());
        }
        self.participants.insert(member);
        tracing::info!(%member, "participant added");
        Ok(true)
    }

    /// Untags `member` as a participant, removes it from the persisted
    /// roster and drops its lobby tag.
    pub async fn remove_participant<P: Platform, R: RosterStore>(
        &mut self,
        platform: &P,
        roster: &R,
        member: MemberId,
    ) -> Result<bool, SessionError> {
        let role = self.prepared()?.participant_role;
        if !self.participants.contains(&member) {
            return Ok(false);
        }
        platform.untag_member(member, role).await?;
        if let Err(e) = roster.delete(member).await {
            if let Err(undo) = platform.tag_member(member, role).await {
                tracing::warn!(%member, error = %undo, "failed to restore participant tag");
            }
            return Err(e.into());
        }
        self.participants.remove(&member);
        self.drop_lobby_tag(platform, member).await;
        tracing::info!(%member, "participant removed");
        Ok(true)
    }

    pub async fn add_manager<P: Platform>(&mut self, platform: &P, member: MemberId) -> Result<bool, SessionError> {
        let (role, banned_role) = {
            let resources = self.prepared()?;
            (resources.manager_role, resources.banned_role)
        };
        if self.managers.contains(&member) || self.carries_ban(platform, member, banned_role).await? {
            return Ok(false);
        }
        platform.tag_member(member, role).await?;
        self.managers.insert(member);
        tracing::info!(%member, "manager added");
        Ok(true)
    }

    pub async fn remove_manager<P: Platform>(&mut self, platform: &P, member: MemberId) -> Result<bool, SessionError> {
        let role = self.prepared()?.manager_role;
        let applied = platform.untag_member(member, role).await?;
        let tracked = self.managers.remove(&member);
        if applied || tracked {
            tracing::info!(%member, "manager removed");
        }
        Ok(applied || tracked)
    }

    /// Strips participant, manager and lobby tags, then tags `member`
    /// as banned.
    pub async fn ban<P: Platform, R: RosterStore>(
        &mut self,
        platform: &P,
        roster: &R,
        member: MemberId,
    ) -> Result<bool, SessionError> {
        let resources = self.prepared()?.clone();
        if self.banned.contains(&member) {
            return Ok(false);
        }
        if self.participants.contains(&member) {
            self.remove_participant(platform, roster, member).await?;
        } else {
            platform.untag_member(member, resources.participant_role).await?;
        }
        platform.untag_member(member, resources.manager_role).await?;
        self.managers.remove(&member);
        self.drop_lobby_tag(platform, member).await;

        platform.tag_member(member, resources.banned_role).await?;
        self.banned.insert(member);
        tracing::info!(%member, "member banned");
        Ok(true)
    }

    pub async fn unban<P: Platform>(&mut self, platform: &P, member: MemberId) -> Result<bool, SessionError> {
        let role = self.prepared()?.banned_role;
        let applied = platform.untag_member(member, role).await?;
        let tracked = self.banned.remove(&member);
        if applied || tracked {
            tracing::info!(%member, "member unbanned");
        }
        Ok(applied || tracked)
    }

    /// Replaces `member`'s lobby tag with lobby `index` and returns that
    /// lobby's room. The creation-time assignment is left as it was.
    pub async fn assign_lobby<P: Platform>(
        &mut self,
        platform: &P,
        member: MemberId,
        index: u32,
    ) -> Result<ChannelId, SessionError> {
        if !self.phase.is_lobby_active() {
            return Err(SessionError::LobbiesInactive);
        }
        if !self.participants.contains(&member) {
            return Err(SessionError::NotParticipant(member));
        }
        let (room, role) = self
            .assignment
            .as_ref()
            .and_then(|a| a.get(index))
            .map(|lobby| (lobby.room, lobby.role))
            .ok_or(SessionError::NoSuchLobby(index))?;

        if self.lobby_of(member) != Some(index) {
            self.drop_lobby_tag(platform, member).await;
            platform.tag_member(member, role).await?;
            self.lobby_tags.insert(member, index);
            tracing::info!(%member, lobby = index, "lobby assigned");
        }
        Ok(room)
    }

    async fn drop_lobby_tag<P: Platform>(&mut self, platform: &P, member: MemberId) {
        let Some(index) = self.lobby_tags.remove(&member) else {
            return;
        };
        let Some(role) = self.assignment.as_ref().and_then(|a| a.get(index)).map(|l| l.role) else {
            return;
        };
        if let Err(e) = platform.untag_member(member, role).await {
            tracing::warn!(%member, lobby = index, error = %e, "failed to remove lobby tag");
        }
    }

    /// Rebuilds the in-memory tag sets from the roles restored
    /// participants carry, and re-enters `LobbyActive` when `lobbies`
    /// is not empty.
    async fn recover_tags<P: Platform>(&mut self, platform: &P, mut lobbies: BTreeMap<u32, Lobby>) {
        let Some(resources) = self.resources.clone() else {
            return;
        };
        let mut lobby_tags = BTreeMap::new();
        for member in self.participants.clone() {
            let profile = match platform.resolve_member(member.into()).await {
                Ok(Some(profile)) => profile,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(%member, error = %e, "failed to read member tags");
                    continue;
                }
            };
            if profile.has_role(resources.manager_role) {
                self.managers.insert(member);
            }
            if profile.has_role(resources.banned_role) {
                self.banned.insert(member);
            }
            if let Some((index, lobby)) = lobbies.iter_mut().find(|(_, l)| profile.has_role(l.role)) {
                lobby.members.push(member);
                lobby_tags.insert(member, *index);
            }
        }
        if lobbies.is_empty() {
            return;
        }
        tracing::info!(lobbies = lobbies.len(), tagged = lobby_tags.len(), "active lobbies recovered");
        self.assignment = Some(LobbyAssignment { lobbies });
        self.lobby_tags = lobby_tags;
        self.phase = SessionPhase::LobbyActive;
    }

    /// Whether `member` carries the banned role in the guild, whether or
    /// not this session applied it.
    async fn carries_ban<P: Platform>(
        &mut self,
        platform: &P,
        member: MemberId,
        banned_role: RoleId,
    ) -> Result<bool, SessionError> {
        if self.banned.contains(&member) {
            return Ok(true);
        }
        let tagged = platform
            .resolve_member(member.into())
            .await?
            .is_some_and(|profile| profile.has_role(banned_role));
        if tagged {
            self.banned.insert(member);
        }
        Ok(tagged)
    }

    async fn retag_participants<P: Platform>(&self, platform: &P) {
        let Some(role) = self.resources.as_ref().map(|r| r.participant_role) else {
            return;
        };
        for member in &self.participants {
            if let Err(e) = platform.tag_member(*member, role).await {
                tracing::warn!(%member, error = %e, "failed to restore participant tag");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resource helpers
// ---------------------------------------------------------------------------

async fn find_role<P: Platform>(platform: &P, name: &str) -> Result<Option<RoleId>, PlatformError> {
    Ok(platform
        .find_resource(ResourceKind::Role, name, None)
        .await?
        .and_then(ResourceHandle::role))
}

async fn find_channel<P: Platform>(
    platform: &P,
    kind: ResourceKind,
    name: &str,
    parent: Option<ChannelId>,
) -> Result<Option<ChannelId>, PlatformError> {
    Ok(platform
        .find_resource(kind, name, parent)
        .await?
        .and_then(ResourceHandle::channel))
}

async fn create_role<P: Platform>(platform: &P, name: String) -> Result<RoleId, PlatformError> {
    platform
        .create_resource(ResourceSpec::new(ResourceKind::Role, name))
        .await?
        .role()
        .ok_or_else(|| PlatformError::Rejected("created resource is not a role".into()))
}

async fn create_channel<P: Platform>(platform: &P, spec: ResourceSpec) -> Result<ChannelId, PlatformError> {
    let kind = spec.kind;
    let handle = platform.create_resource(spec).await?;
    tracing::debug!(%kind, %handle, "resource created");
    handle
        .channel()
        .ok_or_else(|| PlatformError::Rejected("created resource is not a channel".into()))
}

async fn ensure_role<P: Platform>(platform: &P, name: &str) -> Result<RoleId, PlatformError> {
    match find_role(platform, name).await? {
        Some(role) => Ok(role),
        None => create_role(platform, name.to_string()).await,
    }
}

async fn ensure_channel<P: Platform>(platform: &P, spec: ResourceSpec) -> Result<ChannelId, PlatformError> {
    match find_channel(platform, spec.kind, &spec.name, spec.parent).await? {
        Some(channel) => Ok(channel),
        None => create_channel(platform, spec).await,
    }
}

/// Configured rooms and roles that are only ever looked up.
async fn optional_resources<P: Platform>(
    platform: &P,
    layout: &LayoutConfig,
) -> Result<(Option<ChannelId>, Option<RoleId>), PlatformError> {
    let chill_room = match &layout.chill_room {
        Some(name) => {
            let room = find_channel(platform, ResourceKind::VoiceChannel, name, None).await?;
            if room.is_none() {
                tracing::warn!(%name, "chill room not found");
            }
            room
        }
        None => None,
    };
    let verified_role = match &layout.verified_role {
        Some(name) => {
            let role = find_role(platform, name).await?;
            if role.is_none() {
                tracing::warn!(%name, "verified role not found");
            }
            role
        }
        None => None,
    };
    Ok((chill_room, verified_role))
}

/// Every required resource, or `None` if any is missing.
async fn lookup<P: Platform>(platform: &P, layout: &LayoutConfig) -> Result<Option<SessionResources>, PlatformError> {
    let Some(participant_role) = find_role(platform, &layout.participant_role).await? else {
        return Ok(None);
    };
    let Some(manager_role) = find_role(platform, &layout.manager_role).await? else {
        return Ok(None);
    };
    let Some(banned_role) = find_role(platform, &layout.banned_role).await? else {
        return Ok(None);
    };
    let Some(category) = find_channel(platform, ResourceKind::Category, &layout.category, None).await? else {
        return Ok(None);
    };
    let Some(chat) = find_channel(platform, ResourceKind::TextChannel, &layout.chat, Some(category)).await? else {
        return Ok(None);
    };
    let Some(waiting_room) =
        find_channel(platform, ResourceKind::VoiceChannel, &layout.waiting_room, Some(category)).await?
    else {
        return Ok(None);
    };
    let (chill_room, verified_role) = optional_resources(platform, layout).await?;
    Ok(Some(SessionResources {
        category,
        chat,
        waiting_room,
        participant_role,
        manager_role,
        banned_role,
        chill_room,
        verified_role,
    }))
}

/// The room and role of lobby `index`, as far as they exist.
async fn find_lobby<P: Platform>(
    platform: &P,
    layout: &LayoutConfig,
    category: ChannelId,
    index: u32,
) -> Result<(Option<ChannelId>, Option<RoleId>), PlatformError> {
    let room_name = layout.lobby_room_name(index);
    let room = find_channel(platform, ResourceKind::VoiceChannel, &room_name, Some(category)).await?;
    let role = find_role(platform, &layout.lobby_role_name(index)).await?;
    Ok((room, role))
}

/// Lobbies still standing from an earlier run, numbered from 1 up to
/// the first index with neither a room nor a role. A lobby missing one
/// of the two cannot be used and what remains of it is deleted.
async fn discover_lobbies<P: Platform>(
    platform: &P,
    layout: &LayoutConfig,
    category: ChannelId,
) -> Result<BTreeMap<u32, Lobby>, PlatformError> {
    let mut lobbies = BTreeMap::new();
    for index in 1.. {
        match find_lobby(platform, layout, category, index).await? {
            (Some(room), Some(role)) => {
                lobbies.insert(index, Lobby { room, role, members: Vec::new() });
            }
            (None, None) => break,
            (room, role) => {
                tracing::warn!(lobby = index, "incomplete lobby found, removing");
                if let Some(room) = room {
                    delete_logged(platform, ResourceHandle::Channel(room)).await;
                }
                if let Some(role) = role {
                    delete_logged(platform, ResourceHandle::Role(role)).await;
                }
            }
        }
    }
    Ok(lobbies)
}

/// Whatever session resources exist by name, for cleaning an
/// unresolved session.
async fn leftovers<P: Platform>(platform: &P, layout: &LayoutConfig) -> Vec<ResourceHandle> {
    let mut found = Vec::new();
    let category = find_channel(platform, ResourceKind::Category, &layout.category, None)
        .await
        .ok()
        .flatten();
    if let Some(category) = category {
        for index in 1.. {
            match find_lobby(platform, layout, category, index).await {
                Ok((None, None)) | Err(_) => break,
                Ok((room, role)) => {
                    found.extend(room.map(ResourceHandle::Channel));
                    found.extend(role.map(ResourceHandle::Role));
                }
            }
        }
        for (kind, name) in [
            (ResourceKind::TextChannel, &layout.chat),
            (ResourceKind::VoiceChannel, &layout.waiting_room),
        ] {
            if let Ok(Some(channel)) = find_channel(platform, kind, name, Some(category)).await {
                found.push(ResourceHandle::Channel(channel));
            }
        }
        found.push(ResourceHandle::Channel(category));
    }
    for name in [&layout.participant_role, &layout.manager_role, &layout.banned_role] {
        if let Ok(Some(role)) = find_role(platform, name).await {
            found.push(ResourceHandle::Role(role));
        }
    }
    found
}

/// Moves whoever occupies `room` to `to`. Text channels and categories
/// have no occupants and are skipped.
async fn evacuate<P: Platform>(platform: &P, room: ChannelId, to: ChannelId) -> usize {
    let Ok(occupants) = platform.room_members(room).await else {
        return 0;
    };
    let mut moved = 0;
    for member in occupants {
        match platform.move_member(member, to).await {
            Ok(()) => moved += 1,
            Err(e) => tracing::warn!(%member, %room, error = %e, "failed to evacuate"),
        }
    }
    moved
}

async fn delete_logged<P: Platform>(platform: &P, handle: ResourceHandle) {
    if let Err(e) = platform.delete_resource(handle).await {
        tracing::warn!(%handle, error = %e, "failed to delete resource");
    }
}

async fn rollback<P: Platform>(platform: &P, created: Vec<ResourceHandle>, cause: PlatformError) -> SessionError {
    tracing::warn!(created = created.len(), error = %cause, "lobby creation failed, rolling back");
    for handle in created.into_iter().rev() {
        delete_logged(platform, handle).await;
    }
    cause.into()
}
