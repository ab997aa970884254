//! Lifecycle and roster scenarios against the in-memory platform.

use std::num::NonZeroUsize;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tourney_lobby::partition_with;
use tourney_platform::{
    MemoryPlatform, MemoryRoster, OverwriteTarget, Permission, Platform, ResourceHandle,
    ResourceKind, ResourceSpec, RosterStore,
};
use tourney_protocol::{GuildId, MemberId};
use tourney_session::{LayoutConfig, SessionError, SessionPhase, SessionState};

// =========================================================================
// Helpers
// =========================================================================

const BOT: MemberId = MemberId(1);

fn platform() -> MemoryPlatform {
    let platform = MemoryPlatform::new(BOT, GuildId(1));
    for id in 10..20 {
        platform.add_member(MemberId(id));
    }
    platform
}

fn partition(ids: &[u64], capacity: usize) -> tourney_lobby::Partition {
    partition_with(
        ids.iter().copied().map(MemberId),
        NonZeroUsize::new(capacity).unwrap(),
        &mut StdRng::seed_from_u64(5),
    )
}

async fn prepared(platform: &MemoryPlatform) -> SessionState {
    let mut state = SessionState::default();
    assert!(state.prepare(platform).await.unwrap());
    state
}

// =========================================================================
// Prepare / resolve / clean
// =========================================================================

#[tokio::test]
async fn test_prepare_creates_layout_and_enters_prepared() {
    let p = platform();
    let state = prepared(&p).await;

    assert_eq!(state.phase(), SessionPhase::Prepared);
    let resources = state.resources().unwrap();
    assert_eq!(p.parent_of(resources.chat), Some(resources.category));
    assert_eq!(p.parent_of(resources.waiting_room), Some(resources.category));
    assert_eq!(p.slowmode(resources.chat), Some(30));
    assert!(p.lookup(ResourceKind::Role, "Tournament Participant").is_some());
    assert!(p.lookup(ResourceKind::Role, "Tournament Manager").is_some());
    assert!(p.lookup(ResourceKind::Role, "Tournament Banned").is_some());
}

#[tokio::test]
async fn test_prepare_twice_is_noop() {
    let p = platform();
    let mut state = prepared(&p).await;
    let count = p.resource_count();

    assert!(!state.prepare(&p).await.unwrap());
    assert_eq!(p.resource_count(), count);
    assert_eq!(state.phase(), SessionPhase::Prepared);
}

#[tokio::test]
async fn test_prepare_reuses_existing_resources() {
    let p = platform();
    let first = prepared(&p).await;
    let count = p.resource_count();

    let second = prepared(&p).await;
    assert_eq!(p.resource_count(), count);
    assert_eq!(first.resources(), second.resources());
}

#[tokio::test]
async fn test_resolve_without_resources_changes_nothing() {
    let p = platform();
    let mut state = SessionState::default();
    assert!(!state.resolve(&p).await.unwrap());
    assert_eq!(state.phase(), SessionPhase::Unprepared);
    assert_eq!(p.resource_count(), 0);
}

#[tokio::test]
async fn test_resolve_finds_previous_layout_and_publishes() {
    let p = platform();
    let original = prepared(&p).await;

    let mut state = SessionState::default();
    let watch = state.subscribe();
    assert!(watch.borrow().is_none());

    assert!(state.resolve(&p).await.unwrap());
    assert_eq!(state.phase(), SessionPhase::Prepared);
    assert_eq!(state.resources(), original.resources());
    assert_eq!(watch.borrow().as_deref(), original.resources());
}

#[tokio::test]
async fn test_verified_role_replaces_everyone_grant() {
    let p = platform();
    let verified = p
        .create_resource(ResourceSpec::new(ResourceKind::Role, "Verified"))
        .await
        .unwrap()
        .role()
        .unwrap();
    let layout = LayoutConfig {
        verified_role: Some("Verified".into()),
        ..LayoutConfig::default()
    };
    let mut state = SessionState::new(layout);
    state.prepare(&p).await.unwrap();

    let chat = state.resources().unwrap().chat;
    let everyone = p.overwrite(chat, OverwriteTarget::Everyone).unwrap();
    assert!(everyone.allow.is_empty());
    let grant = p.overwrite(chat, OverwriteTarget::Role(verified)).unwrap();
    assert!(grant.allows(Permission::View));
}

#[tokio::test]
async fn test_clean_from_lobbies_returns_to_unprepared() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut state = prepared(&p).await;
    let watch = state.subscribe();
    state.add_participant(&p, &roster, MemberId(10)).await.unwrap();
    state.start_lobbies(&p, partition(&[10], 10)).await.unwrap();

    state.clean(&p, &roster).await;

    assert_eq!(state.phase(), SessionPhase::Unprepared);
    assert!(state.participants().is_empty());
    assert!(state.assignment().is_none());
    assert!(roster.list().await.unwrap().is_empty());
    assert_eq!(p.resource_count(), 0);
    assert!(watch.borrow().is_none());
}

#[tokio::test]
async fn test_clean_unresolved_session_removes_leftovers() {
    let p = platform();
    prepared(&p).await;
    let mut fresh = SessionState::default();
    fresh.clean(&p, &MemoryRoster::new()).await;
    assert_eq!(p.resource_count(), 0);
}

// =========================================================================
// Roster and tags
// =========================================================================

#[tokio::test]
async fn test_add_participant_requires_prepare() {
    let p = platform();
    let mut state = SessionState::default();
    let err = state
        .add_participant(&p, &MemoryRoster::new(), MemberId(10))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotPrepared));
}

#[tokio::test]
async fn test_add_participant_twice_true_then_false() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut state = prepared(&p).await;

    assert!(state.add_participant(&p, &roster, MemberId(10)).await.unwrap());
    assert!(!state.add_participant(&p, &roster, MemberId(10)).await.unwrap());
    assert_eq!(roster.list().await.unwrap(), vec![MemberId(10)]);
    let role = state.resources().unwrap().participant_role;
    assert!(p.roles_of(MemberId(10)).contains(&role));
}

#[tokio::test]
async fn test_add_participant_roster_failure_undoes_tag() {
    let p = platform();
    let roster = MemoryRoster::new();
    roster.fail_writes(true);
    let mut state = prepared(&p).await;

    assert!(state.add_participant(&p, &roster, MemberId(10)).await.is_err());
    assert!(!state.is_participant(MemberId(10)));
    let role = state.resources().unwrap().participant_role;
    assert!(!p.roles_of(MemberId(10)).contains(&role));
}

#[tokio::test]
async fn test_ban_after_join_strips_everything() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut state = prepared(&p).await;
    state.add_participant(&p, &roster, MemberId(10)).await.unwrap();
    state.add_manager(&p, MemberId(10)).await.unwrap();

    assert!(state.ban(&p, &roster, MemberId(10)).await.unwrap());

    assert!(!state.is_participant(MemberId(10)));
    assert!(!state.managers().contains(&MemberId(10)));
    assert!(state.is_banned(MemberId(10)));
    assert!(!roster.contains(MemberId(10)));
    let resources = state.resources().unwrap();
    let roles = p.roles_of(MemberId(10));
    assert!(!roles.contains(&resources.participant_role));
    assert!(!roles.contains(&resources.manager_role));
    assert!(roles.contains(&resources.banned_role));
}

#[tokio::test]
async fn test_banned_member_cannot_join_until_unbanned() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut state = prepared(&p).await;
    state.ban(&p, &roster, MemberId(11)).await.unwrap();

    assert!(!state.add_participant(&p, &roster, MemberId(11)).await.unwrap());
    assert!(!state.add_manager(&p, MemberId(11)).await.unwrap());

    assert!(state.unban(&p, MemberId(11)).await.unwrap());
    assert!(!state.unban(&p, MemberId(11)).await.unwrap());
    assert!(state.add_participant(&p, &roster, MemberId(11)).await.unwrap());
}

#[tokio::test]
async fn test_add_participant_banned_in_earlier_run_is_refused() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut first = prepared(&p).await;
    first.ban(&p, &roster, MemberId(11)).await.unwrap();

    let mut state = SessionState::default();
    assert!(state.resolve(&p).await.unwrap());
    assert!(!state.add_participant(&p, &roster, MemberId(11)).await.unwrap());
    assert!(!state.add_manager(&p, MemberId(11)).await.unwrap());

    let resources = state.resources().unwrap();
    let roles = p.roles_of(MemberId(11));
    assert!(!roles.contains(&resources.participant_role));
    assert!(!roles.contains(&resources.manager_role));
    assert!(state.is_banned(MemberId(11)));
    assert!(roster.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resolve_picks_up_manager_tags_of_restored_participants() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut first = prepared(&p).await;
    first.add_participant(&p, &roster, MemberId(12)).await.unwrap();
    first.add_manager(&p, MemberId(12)).await.unwrap();

    let mut state = SessionState::default();
    state.restore_roster(&roster).await.unwrap();
    state.resolve(&p).await.unwrap();

    assert!(state.managers().contains(&MemberId(12)));
    assert!(state.banned().is_empty());
}

#[tokio::test]
async fn test_restore_roster_then_prepare_retags() {
    let p = platform();
    let roster = MemoryRoster::with_members([MemberId(12), MemberId(13)]);
    let mut state = SessionState::default();

    assert_eq!(state.restore_roster(&roster).await.unwrap(), 2);
    state.prepare(&p).await.unwrap();

    let role = state.resources().unwrap().participant_role;
    assert!(p.roles_of(MemberId(12)).contains(&role));
    assert!(p.roles_of(MemberId(13)).contains(&role));
}

// =========================================================================
// Lobbies
// =========================================================================

#[tokio::test]
async fn test_start_three_members_capacity_one_then_end() {
    let p = platform();
    let mut state = prepared(&p).await;

    let untagged = state.start_lobbies(&p, partition(&[10, 11, 12], 1)).await.unwrap();
    assert!(untagged.is_empty());
    assert_eq!(state.phase(), SessionPhase::LobbyActive);
    let assignment = state.assignment().unwrap().clone();
    assert_eq!(assignment.len(), 3);
    for (index, lobby) in assignment.iter() {
        assert_eq!(lobby.members.len(), 1);
        assert_eq!(state.lobby_of(lobby.members[0]), Some(index));
        assert!(p.roles_of(lobby.members[0]).contains(&lobby.role));
    }
    assert!(p.lookup(ResourceKind::VoiceChannel, "Lobby 3").is_some());

    state.end_lobbies(&p).await.unwrap();

    assert_eq!(state.phase(), SessionPhase::Prepared);
    assert!(state.assignment().is_none());
    for (_, lobby) in assignment.iter() {
        assert_eq!(state.lobby_of(lobby.members[0]), None);
        assert!(p.roles_of(lobby.members[0]).is_empty());
    }
    assert!(p.lookup(ResourceKind::VoiceChannel, "Lobby 1").is_none());
    assert!(p.lookup(ResourceKind::Role, "Tournament Lobby 1").is_none());
}

#[tokio::test]
async fn test_start_twice_fails_and_keeps_first_assignment() {
    let p = platform();
    let mut state = prepared(&p).await;
    state.start_lobbies(&p, partition(&[10, 11], 1)).await.unwrap();
    let first = state.assignment().cloned();
    let count = p.resource_count();

    let err = state.start_lobbies(&p, partition(&[12, 13, 14], 1)).await.unwrap_err();

    assert!(matches!(err, SessionError::LobbiesActive));
    assert!(err.is_state_error());
    assert_eq!(state.assignment().cloned(), first);
    assert_eq!(p.resource_count(), count);
}

#[tokio::test]
async fn test_start_before_prepare_is_state_error() {
    let p = platform();
    let mut state = SessionState::default();
    let err = state.start_lobbies(&p, partition(&[10], 1)).await.unwrap_err();
    assert!(matches!(err, SessionError::NotPrepared));
}

#[tokio::test]
async fn test_start_with_no_members_makes_no_lobbies() {
    let p = platform();
    let mut state = prepared(&p).await;
    state.start_lobbies(&p, partition(&[], 10)).await.unwrap();
    assert_eq!(state.phase(), SessionPhase::LobbyActive);
    assert!(state.assignment().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_creation_failure_rolls_back() {
    let p = platform();
    let mut state = prepared(&p).await;
    let category = state.resources().unwrap().category;
    p.delete_resource(ResourceHandle::Channel(category)).await.unwrap();
    let count = p.resource_count();

    let err = state.start_lobbies(&p, partition(&[10, 11], 1)).await.unwrap_err();

    assert!(!err.is_state_error());
    assert_eq!(state.phase(), SessionPhase::Prepared);
    assert!(state.assignment().is_none());
    assert_eq!(p.resource_count(), count);
}

#[tokio::test]
async fn test_end_without_lobbies_is_state_error() {
    let p = platform();
    let mut state = prepared(&p).await;
    let err = state.end_lobbies(&p).await.unwrap_err();
    assert!(matches!(err, SessionError::LobbiesInactive));
    assert_eq!(state.phase(), SessionPhase::Prepared);
}

#[tokio::test]
async fn test_end_moves_occupants_to_waiting_room() {
    let p = platform();
    let mut state = prepared(&p).await;
    state.start_lobbies(&p, partition(&[10], 1)).await.unwrap();
    let room = state.assignment().unwrap().get(1).unwrap().room;
    p.place(MemberId(10), room);

    assert_eq!(state.end_lobbies(&p).await.unwrap(), 1);
    assert_eq!(p.room_of(MemberId(10)), Some(state.resources().unwrap().waiting_room));
}

#[tokio::test]
async fn test_remove_participant_drops_lobby_tag() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut state = prepared(&p).await;
    state.add_participant(&p, &roster, MemberId(10)).await.unwrap();
    state.start_lobbies(&p, partition(&[10], 1)).await.unwrap();
    let role = state.assignment().unwrap().get(1).unwrap().role;

    assert!(state.remove_participant(&p, &roster, MemberId(10)).await.unwrap());
    assert_eq!(state.lobby_of(MemberId(10)), None);
    assert!(!p.roles_of(MemberId(10)).contains(&role));
    assert_eq!(state.assignment().unwrap().placed_in(MemberId(10)), Some(1));
}

#[tokio::test]
async fn test_assign_lobby_replaces_tag_only() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut state = prepared(&p).await;
    for id in [10, 11] {
        state.add_participant(&p, &roster, MemberId(id)).await.unwrap();
    }
    state.start_lobbies(&p, partition(&[10, 11], 1)).await.unwrap();
    let from = state.lobby_of(MemberId(10)).unwrap();
    let to = if from == 1 { 2 } else { 1 };
    let before = state.assignment().cloned();

    let room = state.assign_lobby(&p, MemberId(10), to).await.unwrap();

    let assignment = state.assignment().unwrap();
    assert_eq!(room, assignment.get(to).unwrap().room);
    assert_eq!(state.lobby_of(MemberId(10)), Some(to));
    let roles = p.roles_of(MemberId(10));
    assert!(roles.contains(&assignment.get(to).unwrap().role));
    assert!(!roles.contains(&assignment.get(from).unwrap().role));
    assert_eq!(state.assignment().cloned(), before);
}

#[tokio::test]
async fn test_assign_lobby_rejects_bad_requests() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut state = prepared(&p).await;
    state.add_participant(&p, &roster, MemberId(10)).await.unwrap();

    let inactive = state.assign_lobby(&p, MemberId(10), 1).await.unwrap_err();
    assert!(matches!(inactive, SessionError::LobbiesInactive));

    state.start_lobbies(&p, partition(&[10], 1)).await.unwrap();
    let stranger = state.assign_lobby(&p, MemberId(15), 1).await.unwrap_err();
    assert!(matches!(stranger, SessionError::NotParticipant(MemberId(15))));
    let missing = state.assign_lobby(&p, MemberId(10), 7).await.unwrap_err();
    assert!(matches!(missing, SessionError::NoSuchLobby(7)));
}

#[tokio::test]
async fn test_resolve_with_standing_lobbies_enters_lobby_active() {
    let p = platform();
    let roster = MemoryRoster::new();
    let mut first = prepared(&p).await;
    for id in [10, 11] {
        first.add_participant(&p, &roster, MemberId(id)).await.unwrap();
    }
    first.start_lobbies(&p, partition(&[10, 11], 1)).await.unwrap();
    let before = first.assignment().cloned().unwrap();

    let mut state = SessionState::default();
    state.restore_roster(&roster).await.unwrap();
    assert!(state.resolve(&p).await.unwrap());

    assert_eq!(state.phase(), SessionPhase::LobbyActive);
    let recovered = state.assignment().unwrap();
    assert_eq!(recovered.len(), 2);
    for (index, lobby) in before.iter() {
        let found = recovered.get(index).unwrap();
        assert_eq!((found.room, found.role), (lobby.room, lobby.role));
        assert_eq!(found.members, lobby.members);
        assert_eq!(state.lobby_of(lobby.members[0]), Some(index));
    }

    state.end_lobbies(&p).await.unwrap();
    assert_eq!(state.phase(), SessionPhase::Prepared);
    assert!(p.lookup(ResourceKind::VoiceChannel, "Lobby 1").is_none());
    assert!(p.lookup(ResourceKind::Role, "Tournament Lobby 2").is_none());
}

#[tokio::test]
async fn test_resolve_removes_lobby_missing_its_role() {
    let p = platform();
    let mut first = prepared(&p).await;
    first.start_lobbies(&p, partition(&[10], 1)).await.unwrap();
    let role = first.assignment().unwrap().get(1).unwrap().role;
    p.delete_resource(ResourceHandle::Role(role)).await.unwrap();

    let mut state = SessionState::default();
    assert!(state.resolve(&p).await.unwrap());

    assert_eq!(state.phase(), SessionPhase::Prepared);
    assert!(state.assignment().is_none());
    assert!(p.lookup(ResourceKind::VoiceChannel, "Lobby 1").is_none());
}

#[tokio::test]
async fn test_clean_unresolved_session_removes_standing_lobbies() {
    let p = platform();
    let mut first = prepared(&p).await;
    first.start_lobbies(&p, partition(&[10, 11, 12], 1)).await.unwrap();

    let mut fresh = SessionState::default();
    fresh.clean(&p, &MemoryRoster::new()).await;

    assert_eq!(p.resource_count(), 0);
    assert!(p.lookup(ResourceKind::Role, "Tournament Lobby 3").is_none());
}
