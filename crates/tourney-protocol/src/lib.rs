//! Shared vocabulary for Tourney.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identities** ([`MemberId`], [`ChannelId`], [`RoleId`], ...) and
//!   the session [`Tag`]s.
//! - **Messages** ([`InboundMessage`], [`Origin`]) and the command
//!   grammar ([`Command`], [`MemberRef`]).
//! - **Presence** ([`PresenceFacts`]) sampled from the platform.
//! - **Reports** ([`Report`], [`Outgoing`]) published back to operators.
//! - **Codec** ([`Codec`], [`JsonCodec`]) for persisted data.
//!
//! It knows nothing about the platform or the session state.

mod codec;
mod command;
mod error;
mod report;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use command::{Command, MemberRef, OVERRIDE_ARG};
pub use error::ProtocolError;
pub use report::{Outgoing, Report, ReportEntry, ReportSection};
pub use types::{
    ChannelId, GuildId, HistoricMessage, InboundMessage, MemberId, MessageId, Origin,
    PresenceFacts, Reaction, RoleId, Status, Tag, VoiceState,
};
