//! # Tourney
//!
//! A chat bot that lets several operators run a tournament session at
//! once: a roster of participants, manager and ban tags, and breakout
//! lobbies created on demand.
//!
//! Operators type commands (`JOIN`, `START`, `SUMMON +`, ...). The
//! [`RuleProcessor`] matches each message against the [`rules::RULES`]
//! table, and the matched command runs under the session lock so two
//! mutating commands never interleave.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tourney::prelude::*;
//!
//! # async fn demo() -> Result<(), TourneyError> {
//! let platform = MemoryPlatform::new(MemberId(1), GuildId(1));
//! let bot = TournamentBotBuilder::new()
//!     .config(BotConfig::load("tourney.toml")?)
//!     .build(platform, MemoryRoster::new());
//! bot.start().await?;
//!
//! let (_events_tx, events) = tokio::sync::mpsc::channel(64);
//! bot.run(events).await;
//! # Ok(())
//! # }
//! ```

mod bot;
mod config;
mod error;
mod handlers;
mod processor;
pub mod rules;
mod telemetry;

pub use bot::{TournamentBot, TournamentBotBuilder};
pub use config::{BotConfig, ConfigError, DEFAULT_BACKLOG_LIMIT, RosterConfig};
pub use error::TourneyError;
pub use processor::{Dispatch, Invocation, RuleProcessor};
pub use telemetry::init_tracing;

/// Everything needed to embed the bot.
pub mod prelude {
    pub use crate::{
        BotConfig, ConfigError, Dispatch, RosterConfig, RuleProcessor, TournamentBot,
        TournamentBotBuilder, TourneyError, init_tracing,
    };

    pub use tourney_lobby::{Eligibility, LobbyConfig, PresenceConfig};
    pub use tourney_platform::{JsonFileRoster, Platform, PlatformError, PlatformEvent, RosterStore};
    #[cfg(feature = "memory")]
    pub use tourney_platform::{MemoryPlatform, MemoryRoster};
    pub use tourney_protocol::{
        ChannelId, GuildId, InboundMessage, MemberId, MessageId, Origin, Outgoing, Reaction,
        Report, Status,
    };
    pub use tourney_session::{LayoutConfig, SessionError, SessionPhase, SessionState};
}
