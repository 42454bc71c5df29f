//! Packets the engine emits towards the target-protocol client.
//!
//! Every packet addresses entities by [`TargetId`]. Encoding these onto the
//! wire belongs to the transport; the engine only builds them.

use gateway_entity::{MetadataValue, TargetField, TargetId};
use gateway_math::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Appearance assigned to roster entries before a real skin is known.
pub const DEFAULT_APPEARANCE: &str = "Standard_Custom";

// ── Entity links ────────────────────────────────────────────────────────────

/// How the child of an [`EntityLink`] relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    /// Dissolves a previous link.
    Remove,
    Rider,
    Passenger,
}

/// A rider/passenger relationship between two target entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityLink {
    pub parent: TargetId,
    pub child: TargetId,
    pub link_type: LinkType,
    /// Whether the client should treat the child as the visually primary
    /// entity of the pair.
    pub child_is_primary: bool,
}

impl EntityLink {
    #[must_use]
    pub fn new(parent: TargetId, child: TargetId, link_type: LinkType) -> Self {
        Self {
            parent,
            child,
            link_type,
            child_is_primary: false,
        }
    }

    /// The same pair with the link dissolved.
    #[must_use]
    pub fn removal(self) -> Self {
        Self {
            link_type: LinkType::Remove,
            ..self
        }
    }

    #[must_use]
    pub fn involves(&self, target_id: TargetId) -> bool {
        self.parent == target_id || self.child == target_id
    }
}

// ── Movement ────────────────────────────────────────────────────────────────

/// Whether a move is interpolated by the client or applied instantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveMode {
    Normal,
    Teleport,
}

// ── Attributes and roster ───────────────────────────────────────────────────

/// A bounded numeric attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub value: f32,
    pub default: f32,
}

/// One player entry on the target client's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub uuid: Uuid,
    pub name: String,
    pub target_id: TargetId,
    pub appearance: String,
}

impl RosterEntry {
    /// An entry carrying the default appearance.
    #[must_use]
    pub fn with_default_appearance(uuid: Uuid, name: impl Into<String>, target_id: TargetId) -> Self {
        Self {
            uuid,
            name: name.into(),
            target_id,
            appearance: DEFAULT_APPEARANCE.to_string(),
        }
    }
}

// ── Packets ─────────────────────────────────────────────────────────────────

/// An outbound target-protocol packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetPacket {
    /// Spawns a player entity.
    AddPlayer {
        target_id: TargetId,
        uuid: Uuid,
        username: String,
        position: Vec3,
        rotation: Vec3,
        motion: Vec3,
        metadata: Vec<(TargetField, MetadataValue)>,
    },
    /// Spawns any non-player entity.
    AddEntity {
        target_id: TargetId,
        identifier: String,
        position: Vec3,
        rotation: Vec3,
        motion: Vec3,
        metadata: Vec<(TargetField, MetadataValue)>,
    },
    RemoveEntity {
        target_id: TargetId,
    },
    MovePlayer {
        target_id: TargetId,
        position: Vec3,
        rotation: Vec3,
        on_ground: bool,
        mode: MoveMode,
    },
    MoveEntityAbsolute {
        target_id: TargetId,
        position: Vec3,
        rotation: Vec3,
        on_ground: bool,
        teleported: bool,
    },
    SetEntityMotion {
        target_id: TargetId,
        motion: Vec3,
    },
    SetEntityData {
        target_id: TargetId,
        metadata: Vec<(TargetField, MetadataValue)>,
    },
    UpdateAttributes {
        target_id: TargetId,
        attributes: Vec<Attribute>,
    },
    SetEntityLink {
        link: EntityLink,
    },
    RosterAdd {
        entries: Vec<RosterEntry>,
    },
    RosterRemove {
        uuids: Vec<Uuid>,
    },
}

impl TargetPacket {
    /// The entity this packet addresses, for packets that address exactly one.
    #[must_use]
    pub fn target_id(&self) -> Option<TargetId> {
        match self {
            Self::AddPlayer { target_id, .. }
            | Self::AddEntity { target_id, .. }
            | Self::RemoveEntity { target_id }
            | Self::MovePlayer { target_id, .. }
            | Self::MoveEntityAbsolute { target_id, .. }
            | Self::SetEntityMotion { target_id, .. }
            | Self::SetEntityData { target_id, .. }
            | Self::UpdateAttributes { target_id, .. } => Some(*target_id),
            Self::SetEntityLink { .. } | Self::RosterAdd { .. } | Self::RosterRemove { .. } => None,
        }
    }

    /// Short packet name for log lines.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddPlayer { .. } => "add_player",
            Self::AddEntity { .. } => "add_entity",
            Self::RemoveEntity { .. } => "remove_entity",
            Self::MovePlayer { .. } => "move_player",
            Self::MoveEntityAbsolute { .. } => "move_entity_absolute",
            Self::SetEntityMotion { .. } => "set_entity_motion",
            Self::SetEntityData { .. } => "set_entity_data",
            Self::UpdateAttributes { .. } => "update_attributes",
            Self::SetEntityLink { .. } => "set_entity_link",
            Self::RosterAdd { .. } => "roster_add",
            Self::RosterRemove { .. } => "roster_remove",
        }
    }

    /// Returns `true` for packets that spawn an entity.
    #[must_use]
    pub fn is_spawn(&self) -> bool {
        matches!(self, Self::AddPlayer { .. } | Self::AddEntity { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_id_accessor() {
        let packet = TargetPacket::RemoveEntity {
            target_id: TargetId(9),
        };
        assert_eq!(packet.target_id(), Some(TargetId(9)));
        assert_eq!(packet.name(), "remove_entity");

        let link = TargetPacket::SetEntityLink {
            link: EntityLink::new(TargetId(1), TargetId(2), LinkType::Passenger),
        };
        assert_eq!(link.target_id(), None);
        assert!(!link.is_spawn());
    }

    #[test]
    fn test_link_removal_keeps_endpoints() {
        let link = EntityLink::new(TargetId(3), TargetId(4), LinkType::Rider);
        let removal = link.removal();
        assert_eq!(removal.link_type, LinkType::Remove);
        assert_eq!((removal.parent, removal.child), (TargetId(3), TargetId(4)));
        assert!(removal.involves(TargetId(4)));
        assert!(!removal.involves(TargetId(5)));
    }

    #[test]
    fn test_default_roster_entry() {
        let uuid = Uuid::new_v4();
        let entry = RosterEntry::with_default_appearance(uuid, "Alice", TargetId(7));
        assert_eq!(entry.appearance, DEFAULT_APPEARANCE);
        assert_eq!(entry.name, "Alice");
    }
}
