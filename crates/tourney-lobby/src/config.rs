//! Lobby and presence configuration.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Default number of members per lobby.
pub const DEFAULT_CAPACITY: usize = 10;

/// Settings for lobby creation.
///
/// `capacity` is non-zero by construction, so the partitioner never has
/// to divide by zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Maximum members placed in one lobby.
    pub capacity: NonZeroUsize,
}

impl LobbyConfig {
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self { capacity }
    }
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Category names whose rooms bulk moves leave alone unless overridden.
pub const DEFAULT_PROTECTED_CATEGORIES: [&str; 3] = ["Among Us Tournament", "Code Names", "Among Us"];

/// Settings for the eligibility classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Rooms inside these categories count as busy.
    pub protected_categories: BTreeSet<String>,
}

impl PresenceConfig {
    pub fn is_protected(&self, category: &str) -> bool {
        self.protected_categories.contains(category)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            protected_categories: DEFAULT_PROTECTED_CATEGORIES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity_is_ten() {
        assert_eq!(LobbyConfig::default().capacity.get(), 10);
    }

    #[test]
    fn test_zero_capacity_is_rejected_when_parsing() {
        let parsed: Result<LobbyConfig, _> = toml::from_str("capacity = 0");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_missing_capacity_uses_default() {
        let parsed: LobbyConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, LobbyConfig::default());
    }

    #[test]
    fn test_presence_default_protects_game_categories() {
        let presence = PresenceConfig::default();
        assert!(presence.is_protected("Among Us"));
        assert!(presence.is_protected("Code Names"));
        assert!(!presence.is_protected("General"));
    }

    #[test]
    fn test_presence_list_replaces_defaults() {
        let parsed: PresenceConfig =
            toml::from_str("protected_categories = [\"Games\"]").unwrap();
        assert!(parsed.is_protected("Games"));
        assert!(!parsed.is_protected("Among Us"));
    }
}
