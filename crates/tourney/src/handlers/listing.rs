//! LIST: the session at a glance.

use tourney_lobby::{Eligibility, Venue, classify};
use tourney_platform::{Platform, RosterStore};
use tourney_protocol::{Outgoing, Report, ReportSection};
use tourney_session::SessionState;

use super::{Reply, prepared};
use crate::bot::BotState;

/// Plain: phase, lobby count, the roster and, while lobbies run, who is
/// tagged for which lobby. With override: the roster grouped by where
/// each participant is relative to the waiting room.
pub(super) async fn list<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &SessionState,
    override_caution: bool,
) -> Reply {
    let report = if override_caution {
        by_presence(state, session).await?
    } else {
        overview(session)
    };
    Ok(Some(Outgoing::Report(report)))
}

fn overview(session: &SessionState) -> Report {
    let lobbies = session.assignment().map_or(0, |a| a.len());
    let mut report = Report::new()
        .with_section(ReportSection::tally(format!("Lobbies ({})", session.phase()), lobbies))
        .with_section(ReportSection::members(
            "Participants",
            session.participants().iter().copied(),
        ));
    if let Some(assignment) = session.assignment() {
        for (index, _) in assignment.iter() {
            let tagged = session
                .participants()
                .iter()
                .copied()
                .filter(|m| session.lobby_of(*m) == Some(index));
            report.push(ReportSection::members(format!("Lobby {index}"), tagged));
        }
    }
    report
}

async fn by_presence<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &SessionState,
) -> Result<Report, crate::TourneyError> {
    let waiting_room = prepared(session)?.waiting_room;
    let venue = Venue::new(state.platform.guild_id(), waiting_room, &state.config.presence);

    let mut sections: Vec<(Eligibility, ReportSection)> = Eligibility::ALL
        .iter()
        .map(|e| (*e, ReportSection::empty(presence_label(*e))))
        .collect();
    let mut unknown = ReportSection::empty("Presence unknown");

    for member in session.participants().iter().copied() {
        match state.platform.presence(member).await {
            Ok(facts) => {
                let eligibility = classify(&facts, &venue);
                if let Some((_, section)) = sections.iter_mut().find(|(e, _)| *e == eligibility) {
                    section.push(member, None);
                }
            }
            Err(e) => unknown.push(member, Some(e.to_string())),
        }
    }

    let mut report = Report::new();
    for (_, section) in sections {
        report.push(section);
    }
    if unknown.count > 0 {
        report.push(unknown);
    }
    Ok(report)
}

fn presence_label(eligibility: Eligibility) -> &'static str {
    match eligibility {
        Eligibility::Faraway => "Not connected",
        Eligibility::AlreadyPresent => "Waiting",
        Eligibility::Mobile => "On mobile",
        Eligibility::Invisible => "Invisible",
        Eligibility::Busy => "Busy",
        Eligibility::Eligible => "Elsewhere",
    }
}
