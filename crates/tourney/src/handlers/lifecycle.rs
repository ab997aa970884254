//! PREPARE, CLEAN, START, END and TERMINATE.

use std::collections::BTreeMap;

use tourney_lobby::{Eligibility, Venue, classify, partition};
use tourney_platform::{Platform, PlatformError, RosterStore};
use tourney_protocol::{ChannelId, MemberId, Outgoing, Report, ReportSection};
use tourney_session::{SessionError, SessionPhase, SessionState};

use super::{Reply, prepared};
use crate::bot::BotState;

pub(super) async fn prepare<P: Platform, R: RosterStore>(state: &BotState<P, R>, session: &mut SessionState) -> Reply {
    if !session.prepare(&state.platform).await? {
        tracing::info!(phase = %session.phase(), "already prepared");
    }
    Ok(None)
}

pub(super) async fn clean<P: Platform, R: RosterStore>(state: &BotState<P, R>, session: &mut SessionState) -> Reply {
    session.clean(&state.platform, &state.roster).await;
    Ok(None)
}

/// Splits the waiting participants into lobbies and moves them there.
///
/// Without override only participants already in the waiting room
/// play; with it, every participant connected to the guild's voice.
/// Each player is then classified against their own lobby room and
/// moved only if that classification allows it.
pub(super) async fn start<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &mut SessionState,
    override_caution: bool,
) -> Reply {
    match session.phase() {
        SessionPhase::Unprepared => return Err(SessionError::NotPrepared.into()),
        SessionPhase::LobbyActive => return Err(SessionError::LobbiesActive.into()),
        SessionPhase::Prepared => {}
    }
    let waiting_room = prepared(session)?.waiting_room;
    let venue = Venue::new(state.platform.guild_id(), waiting_room, &state.config.presence);

    let mut absent = ReportSection::empty("Participants not here");
    let mut players = Vec::new();
    for member in session.participants().iter().copied() {
        let eligibility = match state.platform.presence(member).await {
            Ok(facts) => classify(&facts, &venue),
            Err(e) => {
                tracing::warn!(%member, error = %e, "failed to read presence");
                absent.push(member, Some(e.to_string()));
                continue;
            }
        };
        let plays = if override_caution {
            eligibility.is_connected()
        } else {
            eligibility == Eligibility::AlreadyPresent
        };
        if plays {
            players.push(member);
        } else {
            absent.push(member, Some(eligibility.to_string()));
        }
    }

    let waiting = players.len();
    let untagged: BTreeMap<MemberId, PlatformError> = session
        .start_lobbies(&state.platform, partition(players, state.config.lobby.capacity))
        .await?
        .into_iter()
        .collect();

    let mut report = Report::new()
        .with_section(absent)
        .with_section(ReportSection::tally("Participants waiting", waiting));

    let lobbies: Vec<(u32, ChannelId, Vec<MemberId>)> = session
        .assignment()
        .map(|a| a.iter().map(|(i, lobby)| (i, lobby.room, lobby.members.clone())).collect())
        .unwrap_or_default();
    for (index, room, members) in lobbies {
        let lobby_venue = venue.toward(room);
        let mut section = ReportSection::empty(format!("Lobby {index}"));
        for member in members {
            let mut notes = Vec::new();
            if let Some(e) = untagged.get(&member) {
                notes.push(format!("not tagged: {e}"));
            }
            if let Some(note) =
                send_to_lobby(&state.platform, member, &lobby_venue, waiting_room, override_caution).await
            {
                notes.push(note);
            }
            section.push(member, (!notes.is_empty()).then(|| notes.join(", ")));
        }
        report.push(section);
    }
    Ok(Some(Outgoing::Report(report)))
}

/// Moves one placed player into their lobby room. Returns a note for
/// the report when the player was not moved.
///
/// The waiting room sits in the tournament category, which is usually
/// protected, so a player waiting there is never held back as busy.
async fn send_to_lobby<P: Platform>(
    platform: &P,
    member: MemberId,
    venue: &Venue<'_>,
    waiting_room: ChannelId,
    override_caution: bool,
) -> Option<String> {
    let eligibility = match platform.presence(member).await {
        Ok(facts) => {
            let waiting = facts
                .voice
                .as_ref()
                .is_some_and(|voice| voice.guild == venue.guild && voice.room == waiting_room);
            match classify(&facts, venue) {
                Eligibility::Busy if waiting => Eligibility::Eligible,
                other => other,
            }
        }
        Err(e) => return Some(format!("presence unavailable: {e}")),
    };
    if !eligibility.should_move(override_caution) {
        return match eligibility {
            Eligibility::AlreadyPresent => None,
            Eligibility::Mobile => Some("on mobile, move by yourself!".into()),
            other => Some(format!("{other}, not moved")),
        };
    }
    match platform.move_member(member, venue.destination).await {
        Ok(()) => {
            tracing::debug!(%member, room = %venue.destination, "moved to lobby");
            None
        }
        Err(e) => {
            tracing::warn!(%member, room = %venue.destination, error = %e, "failed to move to lobby");
            Some(format!("move failed: {e}"))
        }
    }
}

pub(super) async fn end<P: Platform, R: RosterStore>(state: &BotState<P, R>, session: &mut SessionState) -> Reply {
    let evacuated = session.end_lobbies(&state.platform).await?;
    let report = Report::new().with_section(ReportSection::tally("Back in the waiting room", evacuated));
    Ok(Some(Outgoing::Report(report)))
}

/// Runs under the write side, so any bulk command in flight has
/// finished before the run loop is told to stop.
pub(super) async fn terminate<P: Platform, R: RosterStore>(state: &BotState<P, R>) -> Reply {
    tracing::info!("terminate requested");
    state.shutdown.send_replace(true);
    Ok(None)
}
