//! BROADCAST: private announcement to every participant.

use tourney_platform::{Platform, RosterStore};
use tourney_protocol::{Origin, Outgoing, Report, ReportSection};
use tourney_session::SessionState;

use super::{Reply, prepared};
use crate::bot::BotState;

pub(super) async fn broadcast<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &SessionState,
    text: &str,
) -> Reply {
    prepared(session)?;

    let mut delivered = 0;
    let mut undelivered = ReportSection::empty("Not delivered");
    for member in session.participants().iter().copied() {
        let sent = state
            .platform
            .send_message(Origin::Direct(member), Outgoing::Text(text.to_string()))
            .await;
        match sent {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(%member, error = %e, "broadcast not delivered");
                undelivered.push(member, Some(e.to_string()));
            }
        }
    }

    let report = Report::new()
        .with_section(ReportSection::tally("Delivered", delivered))
        .with_section(undelivered);
    Ok(Some(Outgoing::Report(report)))
}
