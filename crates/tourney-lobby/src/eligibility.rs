//! Presence-based eligibility for bulk moves.
//!
//! [`classify`] puts a member into exactly one [`Eligibility`] category.
//! Categories are checked in a fixed order and the first match wins, so
//! a mobile member sitting in a protected room is `Mobile`, not `Busy`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tourney_protocol::{ChannelId, GuildId, PresenceFacts};

use crate::PresenceConfig;

/// Where a bulk move wants members to end up.
#[derive(Debug, Clone, Copy)]
pub struct Venue<'a> {
    /// The guild whose voice space counts as "connected".
    pub guild: GuildId,
    /// Destination room of the move.
    pub destination: ChannelId,
    pub presence: &'a PresenceConfig,
}

impl<'a> Venue<'a> {
    pub fn new(guild: GuildId, destination: ChannelId, presence: &'a PresenceConfig) -> Self {
        Self {
            guild,
            destination,
            presence,
        }
    }

    /// The same venue with another destination room.
    pub fn toward(self, destination: ChannelId) -> Self {
        Self {
            destination,
            ..self
        }
    }
}

/// Reachability of a member relative to a [`Venue`].
///
/// Variants are declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Eligibility {
    /// Not in voice, or in voice on another guild. Never moved.
    Faraway,
    /// Already in the destination room.
    AlreadyPresent,
    /// On a mobile client; forced moves break its UI.
    Mobile,
    /// Invisible or offline status.
    Invisible,
    /// In a room under a protected category.
    Busy,
    Eligible,
}

impl Eligibility {
    pub const ALL: [Eligibility; 6] = [
        Self::Faraway,
        Self::AlreadyPresent,
        Self::Mobile,
        Self::Invisible,
        Self::Busy,
        Self::Eligible,
    ];

    /// Whether a move should be attempted for this category.
    pub fn should_move(self, override_caution: bool) -> bool {
        match self {
            Self::Faraway | Self::AlreadyPresent => false,
            Self::Mobile | Self::Invisible | Self::Busy => override_caution,
            Self::Eligible => true,
        }
    }

    /// Connected to the guild voice space, wherever that is.
    pub fn is_connected(self) -> bool {
        self != Self::Faraway
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Faraway => "faraway",
            Self::AlreadyPresent => "already present",
            Self::Mobile => "mobile",
            Self::Invisible => "invisible",
            Self::Busy => "busy",
            Self::Eligible => "eligible",
        };
        f.write_str(name)
    }
}

/// Classifies one member's presence against `venue`.
pub fn classify(facts: &PresenceFacts, venue: &Venue<'_>) -> Eligibility {
    let voice = match &facts.voice {
        Some(voice) if voice.guild == venue.guild => voice,
        _ => return Eligibility::Faraway,
    };
    if voice.room == venue.destination {
        return Eligibility::AlreadyPresent;
    }
    if facts.mobile {
        return Eligibility::Mobile;
    }
    if facts.status.is_hidden() {
        return Eligibility::Invisible;
    }
    if voice
        .category
        .as_deref()
        .is_some_and(|category| venue.presence.is_protected(category))
    {
        return Eligibility::Busy;
    }
    Eligibility::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_protocol::{Status, VoiceState};

    const GUILD: GuildId = GuildId(1);
    const DEST: ChannelId = ChannelId(100);

    fn in_room(room: u64, category: Option<&str>) -> PresenceFacts {
        PresenceFacts {
            voice: Some(VoiceState {
                guild: GUILD,
                room: ChannelId(room),
                category: category.map(str::to_string),
            }),
            mobile: false,
            status: Status::Online,
        }
    }

    fn check(facts: &PresenceFacts) -> Eligibility {
        let presence = PresenceConfig::default();
        classify(facts, &Venue::new(GUILD, DEST, &presence))
    }

    #[test]
    fn test_classify_no_voice_is_faraway() {
        assert_eq!(check(&PresenceFacts::default()), Eligibility::Faraway);
    }

    #[test]
    fn test_classify_other_guild_is_faraway() {
        let mut facts = in_room(100, None);
        if let Some(voice) = facts.voice.as_mut() {
            voice.guild = GuildId(2);
        }
        assert_eq!(check(&facts), Eligibility::Faraway);
    }

    #[test]
    fn test_classify_destination_room_is_already_present() {
        let mut facts = in_room(100, Some("Among Us"));
        facts.mobile = true;
        assert_eq!(check(&facts), Eligibility::AlreadyPresent);
    }

    #[test]
    fn test_classify_mobile_beats_busy() {
        let mut facts = in_room(5, Some("Among Us"));
        facts.mobile = true;
        facts.status = Status::Invisible;
        assert_eq!(check(&facts), Eligibility::Mobile);
    }

    #[test]
    fn test_classify_invisible_beats_busy() {
        let mut facts = in_room(5, Some("Code Names"));
        facts.status = Status::Offline;
        assert_eq!(check(&facts), Eligibility::Invisible);
    }

    #[test]
    fn test_classify_protected_category_is_busy() {
        assert_eq!(check(&in_room(5, Some("Code Names"))), Eligibility::Busy);
    }

    #[test]
    fn test_classify_plain_room_is_eligible() {
        assert_eq!(check(&in_room(5, Some("General"))), Eligibility::Eligible);
        assert_eq!(check(&in_room(5, None)), Eligibility::Eligible);
    }

    #[test]
    fn test_should_move_respects_override() {
        for category in Eligibility::ALL {
            let expected_plain = category == Eligibility::Eligible;
            assert_eq!(category.should_move(false), expected_plain, "{category}");
        }
        assert!(Eligibility::Busy.should_move(true));
        assert!(Eligibility::Mobile.should_move(true));
        assert!(!Eligibility::Faraway.should_move(true));
        assert!(!Eligibility::AlreadyPresent.should_move(true));
    }
}
