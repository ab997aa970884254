//! Command execution.
//!
//! [`execute`] takes the session lock in the mode the command needs,
//! runs the handler for the whole of its side effects, releases the
//! lock, then publishes the reply and reacts to the original message.

mod broadcast;
mod lifecycle;
mod listing;
mod roster;
mod voice;

use std::sync::Arc;
use std::time::Instant;

use tourney_platform::{Platform, PlatformError, RosterStore};
use tourney_protocol::{Command, MemberId, Origin, Outgoing, Reaction};
use tourney_session::{SessionError, SessionResources, SessionState};

use crate::TourneyError;
use crate::bot::BotState;
use crate::processor::Invocation;
use crate::rules::{Access, Args, CommandKind as K};

/// What a handler hands back: an optional reply for the invoker.
type Reply = Result<Option<Outgoing>, TourneyError>;

/// Runs one matched command to completion. Never panics on command
/// failure; failures become the failure reaction and an `error!` line.
pub(crate) async fn execute<P: Platform, R: RosterStore>(state: Arc<BotState<P, R>>, invocation: Invocation) {
    let Invocation { rule, args, command } = invocation;
    let kind = rule.kind;
    let started = Instant::now();

    let outcome = match kind.access() {
        Access::Write => {
            let mut session = state.session.write().await;
            write_command(&state, &mut session, kind, args, &command).await
        }
        Access::Read => {
            let session = state.session.read().await;
            read_command(&state, &session, kind, args).await
        }
    };

    let reaction = match outcome {
        Ok(reply) => {
            if let Some(reply) = reply {
                publish(&state.platform, command.origin, reply).await;
            }
            tracing::info!(
                command = %kind,
                invoker = %command.invoker,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "command done"
            );
            Reaction::Ok
        }
        Err(e) => {
            tracing::error!(command = %kind, invoker = %command.invoker, error = %e, "command failed");
            Reaction::Failed
        }
    };
    acknowledge(&state.platform, &command, reaction).await;
}

async fn write_command<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &mut SessionState,
    kind: K,
    args: Args,
    command: &Command,
) -> Reply {
    let invoker = command.invoker;
    match kind {
        K::Prepare => lifecycle::prepare(state, session).await,
        K::Clean => lifecycle::clean(state, session).await,
        K::Start => lifecycle::start(state, session, args.has_override()).await,
        K::End => lifecycle::end(state, session).await,
        K::Terminate => lifecycle::terminate(state).await,
        K::Join => roster::join(state, session, invoker).await,
        K::Quit => roster::quit(state, session, invoker).await,
        K::Bring | K::Kick | K::Promote | K::Demote | K::Ban | K::Unban => {
            match (roster::TagChange::of(kind), args) {
                (Some(change), Args::Members(members)) => roster::apply(state, session, change, &members).await,
                _ => Err(TourneyError::Misrouted(kind)),
            }
        }
        K::Assign => match args {
            Args::Assign { member, lobby } => voice::assign(state, session, member.id(), lobby).await,
            _ => Err(TourneyError::Misrouted(kind)),
        },
        K::Summon => voice::summon(state, session, args.has_override()).await,
        K::Mute => voice::set_muted(state, session, invoker, true).await,
        K::Unmute => voice::set_muted(state, session, invoker, false).await,
        K::List | K::Broadcast => read_command(state, session, kind, args).await,
    }
}

async fn read_command<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &SessionState,
    kind: K,
    args: Args,
) -> Reply {
    match (kind, args) {
        (K::List, args) => listing::list(state, session, args.has_override()).await,
        (K::Broadcast, Args::Text(text)) => broadcast::broadcast(state, session, &text).await,
        (kind, _) => Err(TourneyError::Misrouted(kind)),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resources of a prepared session.
fn prepared(session: &SessionState) -> Result<&SessionResources, SessionError> {
    session
        .resources()
        .filter(|_| session.phase().is_prepared())
        .ok_or(SessionError::NotPrepared)
}

/// Posts a line to the operations channel. Failures are logged.
async fn announce<P: Platform, R: RosterStore>(state: &BotState<P, R>, session: &SessionState, text: String) {
    let Some(chat) = session.resources().map(|r| r.chat) else {
        return;
    };
    if let Err(e) = state.platform.send_message(Origin::Channel(chat), Outgoing::Text(text)).await {
        tracing::warn!(%chat, error = %e, "failed to announce");
    }
}

async fn publish<P: Platform>(platform: &P, to: Origin, reply: Outgoing) {
    if let Err(e) = platform.send_message(to, reply).await {
        tracing::warn!(%to, error = %e, "failed to publish reply");
    }
}

async fn acknowledge<P: Platform>(platform: &P, command: &Command, reaction: Reaction) {
    match platform.react(command.origin, command.message, reaction).await {
        Ok(()) => {}
        Err(PlatformError::NotFound(_)) => {
            tracing::debug!(message = %command.message, "message gone before reaction");
        }
        Err(e) => {
            tracing::warn!(message = %command.message, error = %e, "failed to react");
        }
    }
}

/// Moves `member` out of a lobby room back to the waiting room once
/// they hold neither the participant nor the manager tag.
async fn evict_from_lobby<P: Platform, R: RosterStore>(
    state: &BotState<P, R>,
    session: &SessionState,
    member: MemberId,
) {
    let Some(resources) = session.resources() else {
        return;
    };
    if session.is_participant(member) || session.managers().contains(&member) {
        return;
    }
    match state.platform.resolve_member(member.into()).await {
        Ok(Some(profile)) if !profile.has_role(resources.manager_role) => {}
        Ok(_) => return,
        Err(e) => {
            tracing::warn!(%member, error = %e, "failed to resolve member");
            return;
        }
    }
    let room = match state.platform.presence(member).await {
        Ok(facts) => facts.voice.map(|voice| voice.room),
        Err(e) => {
            tracing::warn!(%member, error = %e, "failed to read presence");
            return;
        }
    };
    let Some(room) = room.filter(|room| session.lobby_rooms().contains(room)) else {
        return;
    };
    match state.platform.move_member(member, resources.waiting_room).await {
        Ok(()) => tracing::debug!(%member, from = %room, "moved out of lobby"),
        Err(e) => tracing::warn!(%member, error = %e, "failed to move out of lobby"),
    }
}
