//! Commands that move members or change who may speak:
//! SUMMON, ASSIGN, MUTE and UNMUTE.

use tourney_lobby::{Bucket, MoveLedger, Venue, classify};
use tourney_platform::{Overwrite, OverwriteTarget, Platform, RosterStore};
use tourney_protocol::{MemberId, Outgoing, PresenceFacts};
use tourney_session::{SessionState, permissions};

use super::{Reply, prepared};
use crate::bot::BotState;

/// Brings every participant to the waiting room, leaving the cautious
/// categories alone unless overridden.
pub(super) async fn summon<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &mut SessionState,
    override_caution: bool,
) -> Reply {
    let waiting_room = prepared(session)?.waiting_room;
    let venue = Venue::new(state.platform.guild_id(), waiting_room, &state.config.presence);

    let mut ledger = MoveLedger::new();
    for member in session.participants().iter().copied() {
        shift(&state.platform, &mut ledger, member, &venue, override_caution).await;
    }
    tracing::info!(
        moved = ledger.count(Bucket::Moved),
        failed = ledger.count(Bucket::Failed),
        override_caution,
        "participants summoned"
    );
    Ok(Some(Outgoing::Report(ledger.into_report(summon_label))))
}

fn summon_label(bucket: Bucket) -> String {
    let label = match bucket {
        Bucket::Present => "Already here",
        Bucket::Moved => "Summoned",
        Bucket::Faraway => "Could not summon because far away",
        Bucket::Mobile => "Not summoned because on mobile",
        Bucket::Invisible => "Not summoned because invisible",
        Bucket::Busy => "Not summoned because busy",
        Bucket::Failed => "Could not summon",
    };
    label.to_string()
}

/// Classifies one member against `venue` and moves them if allowed,
/// recording the outcome.
async fn shift<P: Platform>(
    platform: &P,
    ledger: &mut MoveLedger,
    member: MemberId,
    venue: &Venue<'_>,
    override_caution: bool,
) {
    let facts = match platform.presence(member).await {
        Ok(facts) => facts,
        Err(e) => {
            tracing::warn!(%member, error = %e, "failed to read presence");
            ledger.failed(member, e.to_string());
            return;
        }
    };
    let eligibility = classify(&facts, venue);
    if !eligibility.should_move(override_caution) {
        ledger.hold(member, eligibility);
        return;
    }
    match platform.move_member(member, venue.destination).await {
        Ok(()) => {
            tracing::debug!(%member, room = %venue.destination, %eligibility, "member moved");
            ledger.moved(member);
        }
        Err(e) => {
            tracing::warn!(%member, room = %venue.destination, error = %e, "move failed");
            ledger.failed(member, format!("{eligibility}, move failed: {e}"));
        }
    }
}

/// Re-tags `member` for lobby `lobby` and moves them to its room. The
/// move is best effort: a member who is not in voice keeps the tag.
pub(super) async fn assign<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &mut SessionState,
    member: MemberId,
    lobby: u32,
) -> Reply {
    let room = session.assign_lobby(&state.platform, member, lobby).await?;
    match state.platform.move_member(member, room).await {
        Ok(()) => tracing::debug!(%member, lobby, "assigned member moved"),
        Err(e) => tracing::warn!(%member, lobby, error = %e, "assigned member not moved"),
    }
    Ok(None)
}

/// Denies or restores the participant role's speak permission in the
/// invoker's room when it is inside the tournament category, otherwise
/// in the waiting room.
pub(super) async fn set_muted<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &SessionState,
    invoker: MemberId,
    muted: bool,
) -> Reply {
    let resources = prepared(session)?;
    let category = session.layout().category.as_str();
    let room = match state.platform.presence(invoker).await {
        Ok(PresenceFacts { voice: Some(voice), .. })
            if voice.guild == state.platform.guild_id() && voice.category.as_deref() == Some(category) =>
        {
            voice.room
        }
        Ok(_) => resources.waiting_room,
        Err(e) => {
            tracing::debug!(%invoker, error = %e, "invoker presence unavailable");
            resources.waiting_room
        }
    };

    let target = OverwriteTarget::Role(resources.participant_role);
    let current = state
        .platform
        .permissions(room, target)
        .await?
        .unwrap_or_else(|| Overwrite::new(target));
    state
        .platform
        .set_permissions(room, permissions::toggle_speak(current, muted))
        .await?;
    tracing::info!(%room, muted, "participant speak permission set");
    Ok(None)
}
