//! The closed set of entity variants the gateway translates.

use serde::{Deserialize, Serialize};

/// What an entity is. Behaviour that differs between kinds is dispatched on
/// this enum rather than through trait objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Any mob without special translation rules, named by its target-protocol
    /// identifier (e.g. `"minecraft:zombie"`).
    Mob(String),
    /// A player. Carries profile, roster, and shoulder state.
    Player,
    /// A parrot. Also used for the decorations synthesised from shoulder tags.
    Parrot,
}

impl EntityKind {
    /// Height of a player's eyes above its feet. The target protocol places a
    /// player's origin at the eyes.
    pub const PLAYER_EYE_HEIGHT: f32 = 1.62;

    /// Target-protocol type identifier sent in add-entity packets.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Mob(identifier) => identifier,
            Self::Player => "minecraft:player",
            Self::Parrot => "minecraft:parrot",
        }
    }

    /// Vertical offset applied on every position write.
    #[must_use]
    pub fn vertical_offset(&self) -> f32 {
        match self {
            Self::Player => Self::PLAYER_EYE_HEIGHT,
            Self::Mob(_) | Self::Parrot => 0.0,
        }
    }

    #[must_use]
    pub fn is_player(&self) -> bool {
        matches!(self, Self::Player)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert_eq!(EntityKind::Player.identifier(), "minecraft:player");
        assert_eq!(EntityKind::Parrot.identifier(), "minecraft:parrot");
        assert_eq!(
            EntityKind::Mob("minecraft:zombie".into()).identifier(),
            "minecraft:zombie"
        );
    }

    #[test]
    fn test_only_players_are_offset() {
        assert!(EntityKind::Player.vertical_offset() > 0.0);
        assert_eq!(EntityKind::Parrot.vertical_offset(), 0.0);
        assert_eq!(EntityKind::Mob("minecraft:pig".into()).vertical_offset(), 0.0);
    }
}
