//! `TournamentBot` builder, startup and event loop.
//!
//! This is the entry point for running the bot. It ties together the
//! layers: platform events → rule processor → session → platform.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tourney_platform::{Platform, PlatformEvent, RosterStore};
use tourney_protocol::{ChannelId, InboundMessage, MemberId};
use tourney_session::{ResourceWatch, SessionLock, SessionState};

use crate::processor::{Dispatch, RuleProcessor};
use crate::rules::{BACKLOG_RULES, RULES};
use crate::{BotConfig, TourneyError};

/// Shared bot state passed to every command task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// session is the only mutable part and sits behind its own lock.
pub(crate) struct BotState<P, R> {
    pub(crate) platform: P,
    pub(crate) roster: R,
    pub(crate) session: SessionLock<SessionState>,
    /// Resource handles, readable without the session lock.
    pub(crate) resources: ResourceWatch,
    pub(crate) config: BotConfig,
    pub(crate) shutdown: watch::Sender<bool>,
}

/// Builder for configuring a [`TournamentBot`].
///
/// # Example
///
/// ```rust
/// use tourney::prelude::*;
///
/// let platform = MemoryPlatform::new(MemberId(1), GuildId(1));
/// let bot = TournamentBotBuilder::new()
///     .config(BotConfig::default())
///     .build(platform, MemoryRoster::new());
/// assert!(!bot.is_terminated());
/// ```
#[derive(Debug, Default)]
pub struct TournamentBotBuilder {
    config: BotConfig,
}

impl TournamentBotBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the bot around a platform and a roster store. Nothing is
    /// contacted until [`TournamentBot::start`].
    pub fn build<P: Platform, R: RosterStore>(self, platform: P, roster: R) -> TournamentBot<P, R> {
        let session = SessionState::new(self.config.layout.clone());
        let resources = session.subscribe();
        let (shutdown, _) = watch::channel(false);

        let state = Arc::new(BotState {
            platform,
            roster,
            session: SessionLock::new(session),
            resources,
            config: self.config,
            shutdown,
        });

        TournamentBot {
            processor: RuleProcessor::new(Arc::clone(&state), RULES),
            backlog: RuleProcessor::new(Arc::clone(&state), BACKLOG_RULES),
            state,
        }
    }
}

/// The tournament bot.
///
/// Call [`start()`](Self::start) once the platform is connected, then
/// [`run()`](Self::run) with the platform's event stream.
pub struct TournamentBot<P, R> {
    state: Arc<BotState<P, R>>,
    processor: RuleProcessor<P, R>,
    backlog: RuleProcessor<P, R>,
}

impl<P: Platform, R: RosterStore> TournamentBot<P, R> {
    pub fn platform(&self) -> &P {
        &self.state.platform
    }

    pub fn roster(&self) -> &R {
        &self.state.roster
    }

    pub fn session(&self) -> &SessionLock<SessionState> {
        &self.state.session
    }

    pub fn config(&self) -> &BotConfig {
        &self.state.config
    }

    pub fn processor(&self) -> &RuleProcessor<P, R> {
        &self.processor
    }

    /// `true` once TERMINATE ran.
    pub fn is_terminated(&self) -> bool {
        *self.state.shutdown.borrow()
    }

    /// Matches one message against the full rule table.
    pub async fn dispatch(&self, message: InboundMessage) -> Dispatch {
        self.processor.run(message).await
    }

    /// Brings the bot up to date with the platform.
    ///
    /// 1. Loads the persisted roster.
    /// 2. Resolves existing resources, or prepares them when
    ///    `prepare_on_ready` is set.
    /// 3. Replays JOIN and QUIT commands posted while the bot was away.
    pub async fn start(&self) -> Result<(), TourneyError> {
        {
            let mut session = self.state.session.write().await;

            let started = Instant::now();
            let restored = session.restore_roster(&self.state.roster).await?;
            tracing::info!(
                restored,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "roster restored"
            );

            let resolved = session.resolve(&self.state.platform).await?;
            if !resolved && self.state.config.prepare_on_ready {
                session.prepare(&self.state.platform).await?;
            }
            tracing::info!(phase = %session.phase(), "session ready");
        }

        self.replay_backlog().await;
        Ok(())
    }

    /// Walks the operations channel from the newest message back to the
    /// bot's own last message, or the last one it reacted to, and runs
    /// the newest JOIN or QUIT of each author.
    async fn replay_backlog(&self) {
        let Some(chat) = self.operations_channel() else {
            return;
        };
        let history = match self
            .state
            .platform
            .history(chat, self.state.config.backlog_limit)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(%chat, error = %e, "failed to read channel history");
                return;
            }
        };

        let bot = self.state.platform.bot_id();
        let mut done: BTreeSet<MemberId> = BTreeSet::new();
        for entry in history {
            if entry.message.author == bot || entry.acknowledged {
                break;
            }
            if done.contains(&entry.message.author) {
                continue;
            }
            let author = entry.message.author;
            let dispatch = self.backlog.run(entry.message).await;
            if !dispatch.is_ignored() {
                done.insert(author);
                dispatch.finish().await;
            }
        }
        tracing::info!(replayed = done.len(), "backlog replayed");
    }

    fn operations_channel(&self) -> Option<ChannelId> {
        self.state.resources.borrow().as_ref().map(|r| r.chat)
    }

    fn waiting_room(&self) -> Option<ChannelId> {
        self.state.resources.borrow().as_ref().map(|r| r.waiting_room)
    }

    /// Processes platform events until TERMINATE runs or the stream
    /// ends. Commands still running are awaited before returning.
    pub async fn run(self, mut events: mpsc::Receiver<PlatformEvent>) {
        let mut shutdown = self.state.shutdown.subscribe();
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
        tracing::info!("tournament bot running");

        loop {
            if *shutdown.borrow_and_update() {
                tracing::info!("terminating");
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => {}
                event = events.recv() => match event {
                    Some(PlatformEvent::Message(message)) => {
                        if let Dispatch::Spawned(handle) = self.processor.run(message).await {
                            in_flight.push(handle);
                        }
                        in_flight.retain(|handle| !handle.is_finished());
                    }
                    Some(PlatformEvent::VoiceMoved { member, from, to }) => {
                        self.log_voice_move(member, from, to);
                    }
                    None => {
                        tracing::info!("event stream closed");
                        break;
                    }
                },
            }
        }

        for handle in in_flight {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "command task failed");
            }
        }
        tracing::info!("tournament bot stopped");
    }

    fn log_voice_move(&self, member: MemberId, from: Option<ChannelId>, to: Option<ChannelId>) {
        let Some(waiting_room) = self.waiting_room() else {
            return;
        };
        if from == to {
            return;
        }
        if from == Some(waiting_room) {
            tracing::info!(%member, "left the waiting room");
        } else if to == Some(waiting_room) {
            tracing::info!(%member, "entered the waiting room");
        } else {
            tracing::debug!(%member, ?from, ?to, "voice move");
        }
    }
}
