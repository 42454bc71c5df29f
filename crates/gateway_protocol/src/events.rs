//! Entity events delivered by the source-protocol feed.
//!
//! The feed is authoritative for entity existence. Events are applied in
//! arrival order by the session that owns them. Recorded feeds are stored as
//! one JSON object per line.

use gateway_entity::{EntityKind, MetadataValue, SourceField, SourceId};
use gateway_math::{Rotation, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtocolError;

/// Account identity of a player in the source protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameProfile {
    pub id: Uuid,
    pub name: String,
}

impl GameProfile {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One event from the source-protocol entity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SourceEvent {
    /// The connecting player itself joined the world.
    JoinGame {
        source_id: SourceId,
        profile: GameProfile,
    },
    /// A player profile was announced ahead of any spawn.
    PlayerInfo {
        profile: GameProfile,
        #[serde(default = "listed_by_default")]
        listed: bool,
    },
    /// A player was taken off the roster.
    PlayerInfoRemove { uuid: Uuid },
    Spawn {
        source_id: SourceId,
        kind: EntityKind,
        position: Vec3,
        #[serde(default)]
        rotation: Rotation,
        #[serde(default)]
        velocity: Vec3,
        #[serde(default)]
        profile: Option<GameProfile>,
    },
    Despawn {
        source_id: SourceId,
    },
    Metadata {
        source_id: SourceId,
        field: SourceField,
        value: MetadataValue,
    },
    MoveAbsolute {
        source_id: SourceId,
        position: Vec3,
        rotation: Rotation,
        on_ground: bool,
        #[serde(default)]
        teleported: bool,
    },
    MoveRelative {
        source_id: SourceId,
        delta: Vec3,
        rotation: Rotation,
        on_ground: bool,
    },
    Velocity {
        source_id: SourceId,
        velocity: Vec3,
    },
    /// Replaces the full passenger list of a vehicle.
    SetPassengers {
        vehicle: SourceId,
        passengers: Vec<SourceId>,
    },
    Effect {
        source_id: SourceId,
        effect_id: i32,
        amplifier: i32,
        duration_ticks: i32,
    },
    RemoveEffect {
        source_id: SourceId,
        effect_id: i32,
    },
}

fn listed_by_default() -> bool {
    true
}

impl SourceEvent {
    /// Parse one line of a recorded feed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Feed`] if the line is not a valid event.
    pub fn from_json_line(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line)?)
    }

    /// The source entity the event concerns, if it names exactly one.
    #[must_use]
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            Self::JoinGame { source_id, .. }
            | Self::Spawn { source_id, .. }
            | Self::Despawn { source_id }
            | Self::Metadata { source_id, .. }
            | Self::MoveAbsolute { source_id, .. }
            | Self::MoveRelative { source_id, .. }
            | Self::Velocity { source_id, .. }
            | Self::Effect { source_id, .. }
            | Self::RemoveEffect { source_id, .. } => Some(*source_id),
            Self::SetPassengers { vehicle, .. } => Some(*vehicle),
            Self::PlayerInfo { .. } | Self::PlayerInfoRemove { .. } => None,
        }
    }
}
