//! JOIN, QUIT and the member-list commands
//! (BRING, KICK, PROMOTE, DEMOTE, BAN, UNBAN).

use tourney_platform::{Platform, RosterStore};
use tourney_protocol::{MemberId, MemberRef, Outgoing, Report, ReportSection};
use tourney_session::SessionState;

use super::{Reply, announce, evict_from_lobby};
use crate::TourneyError;
use crate::bot::BotState;
use crate::rules::CommandKind;

pub(super) async fn join<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &mut SessionState,
    member: MemberId,
) -> Reply {
    if session.add_participant(&state.platform, &state.roster, member).await? {
        announce(state, session, join_line(member)).await;
    }
    Ok(None)
}

pub(super) async fn quit<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &mut SessionState,
    member: MemberId,
) -> Reply {
    if session.remove_participant(&state.platform, &state.roster, member).await? {
        announce(state, session, quit_line(member)).await;
        evict_from_lobby(state, session, member).await;
    }
    Ok(None)
}

fn join_line(member: MemberId) -> String {
    format!("{} joins the tournament", member.mention())
}

fn quit_line(member: MemberId) -> String {
    format!("{} quits the tournament", member.mention())
}

/// Applies one tag change to every listed member.
///
/// Unknown members and per-member platform failures are reported and
/// skipped. A state error (session not prepared) fails the command.
pub(super) async fn apply<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &mut SessionState,
    change: TagChange,
    members: &[MemberRef],
) -> Reply {
    let mut changed = ReportSection::empty(change.label());
    let mut unchanged = ReportSection::empty("Unchanged");
    let mut unknown = ReportSection::empty("Unknown member");
    let mut failed = ReportSection::empty("Failed");

    for target in members {
        let member = target.id();
        match state.platform.resolve_member(*target).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                unknown.push(member, None);
                continue;
            }
            Err(e) => {
                failed.push(member, Some(e.to_string()));
                continue;
            }
        }
        match change.apply(state, session, member).await {
            Ok(true) => changed.push(member, None),
            Ok(false) => unchanged.push(member, None),
            Err(TourneyError::Session(e)) if e.is_state_error() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(command = %change.kind(), %member, error = %e, "member not updated");
                failed.push(member, Some(e.to_string()));
            }
        }
    }

    let mut report = Report::new().with_section(changed);
    for section in [unchanged, unknown, failed] {
        if section.count > 0 {
            report.push(section);
        }
    }
    Ok(Some(Outgoing::Report(report)))
}

/// The tag change made by a member-list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TagChange {
    Bring,
    Kick,
    Promote,
    Demote,
    Ban,
    Unban,
}

impl TagChange {
    pub(super) fn of(kind: CommandKind) -> Option<Self> {
        match kind {
            CommandKind::Bring => Some(Self::Bring),
            CommandKind::Kick => Some(Self::Kick),
            CommandKind::Promote => Some(Self::Promote),
            CommandKind::Demote => Some(Self::Demote),
            CommandKind::Ban => Some(Self::Ban),
            CommandKind::Unban => Some(Self::Unban),
            _ => None,
        }
    }

    fn kind(self) -> CommandKind {
        match self {
            Self::Bring => CommandKind::Bring,
            Self::Kick => CommandKind::Kick,
            Self::Promote => CommandKind::Promote,
            Self::Demote => CommandKind::Demote,
            Self::Ban => CommandKind::Ban,
            Self::Unban => CommandKind::Unban,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Bring => "Brought in",
            Self::Kick => "Kicked out",
            Self::Promote => "Promoted",
            Self::Demote => "Demoted",
            Self::Ban => "Banned",
            Self::Unban => "Unbanned",
        }
    }

    /// One member's tag change plus its announcement and side move.
    async fn apply<P: Platform, R: RosterStore>(
        self,
        state: &BotState<P, R>,
        session: &mut SessionState,
        member: MemberId,
    ) -> Result<bool, TourneyError> {
        let platform = &state.platform;
        let roster = &state.roster;
        let changed = match self {
            Self::Bring => {
                let added = session.add_participant(platform, roster, member).await?;
                if added {
                    announce(state, session, join_line(member)).await;
                }
                added
            }
            Self::Kick => {
                let removed = session.remove_participant(platform, roster, member).await?;
                if removed {
                    announce(state, session, quit_line(member)).await;
                    evict_from_lobby(state, session, member).await;
                }
                removed
            }
            Self::Promote => session.add_manager(platform, member).await?,
            Self::Demote => {
                let removed = session.remove_manager(platform, member).await?;
                if removed {
                    evict_from_lobby(state, session, member).await;
                }
                removed
            }
            Self::Ban => {
                let banned = session.ban(platform, roster, member).await?;
                if banned {
                    announce(state, session, format!("{} banned from tournament", member.mention())).await;
                    send_to_chill_room(state, session, member).await;
                }
                banned
            }
            Self::Unban => {
                let unbanned = session.unban(platform, member).await?;
                if unbanned {
                    announce(state, session, format!("{} unbanned from tournament", member.mention())).await;
                }
                unbanned
            }
        };
        Ok(changed)
    }
}

/// Moves a banned member sitting anywhere in the tournament category to
/// the chill room, if one is configured.
async fn send_to_chill_room<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &SessionState,
    member: MemberId,
) {
    let Some(chill_room) = session.resources().and_then(|r| r.chill_room) else {
        return;
    };
    let category = session.layout().category.as_str();
    let inside = match state.platform.presence(member).await {
        Ok(facts) => facts
            .voice
            .is_some_and(|voice| voice.guild == state.platform.guild_id() && voice.category.as_deref() == Some(category)),
        Err(e) => {
            tracing::warn!(%member, error = %e, "failed to read presence");
            false
        }
    };
    if !inside {
        return;
    }
    match state.platform.move_member(member, chill_room).await {
        Ok(()) => tracing::debug!(%member, room = %chill_room, "banned member moved out"),
        Err(e) => tracing::warn!(%member, error = %e, "failed to move banned member"),
    }
}
