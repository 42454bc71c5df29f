//! The translated in-memory representation of one entity and its base
//! lifecycle.
//!
//! Kind-specific behaviour is selected by matching on [`KindData`]; every
//! operation has a base behaviour that applies to all kinds and a finite set
//! of player overrides.

use std::collections::BTreeMap;

use gateway_entity::{EntityKind, EntityMetadata, SourceId, TargetField, TargetId};
use gateway_math::{Rotation, Transform, Vec3};
use gateway_protocol::{Attribute, GameProfile, TargetPacket};
use tracing::debug;

use crate::context::SessionContext;
use crate::error::EngineError;
use crate::player::PlayerState;
use crate::synthesizer;

/// Per-kind state carried alongside the common entity fields.
#[derive(Debug)]
pub enum KindData {
    /// Mobs and synthesised decorations.
    Basic,
    Player(Box<PlayerState>),
}

/// One translated entity.
#[derive(Debug)]
pub struct EntityModel {
    pub(crate) source_id: Option<SourceId>,
    pub(crate) target_id: TargetId,
    pub(crate) kind: EntityKind,
    pub(crate) transform: Transform,
    pub(crate) on_ground: bool,
    /// Whether the target client has been sent a spawn packet.
    pub(crate) valid: bool,
    pub(crate) metadata: EntityMetadata,
    /// Translated attributes by name, re-sent after every spawn.
    pub(crate) attributes: BTreeMap<String, Attribute>,
    pub(crate) data: KindData,
}

impl EntityModel {
    /// Create a non-player entity. `position` is in source coordinates.
    #[must_use]
    pub fn new(
        source_id: Option<SourceId>,
        target_id: TargetId,
        kind: EntityKind,
        position: Vec3,
        rotation: Rotation,
        velocity: Vec3,
    ) -> Self {
        let mut transform = Transform::new(Vec3::ZERO, rotation, velocity);
        transform.set_position(position, kind.vertical_offset());
        Self {
            source_id,
            target_id,
            kind,
            transform,
            on_ground: false,
            valid: target_id.is_local_player(),
            metadata: EntityMetadata::new(),
            attributes: BTreeMap::new(),
            data: KindData::Basic,
        }
    }

    /// Create a player entity from its profile.
    #[must_use]
    pub fn new_player(
        source_id: Option<SourceId>,
        target_id: TargetId,
        profile: GameProfile,
        roster_visible: bool,
        position: Vec3,
        rotation: Rotation,
        velocity: Vec3,
    ) -> Self {
        let mut model = Self::new(
            source_id,
            target_id,
            EntityKind::Player,
            position,
            rotation,
            velocity,
        );
        model.data = KindData::Player(Box::new(PlayerState::new(profile, roster_visible)));
        model
    }

    /// A decoration that exists only in the target protocol. Its position is
    /// taken verbatim from the parent's stored position.
    #[must_use]
    pub(crate) fn synthetic(target_id: TargetId, kind: EntityKind, transform: Transform) -> Self {
        Self {
            source_id: None,
            target_id,
            kind,
            transform,
            on_ground: true,
            valid: false,
            metadata: EntityMetadata::new(),
            attributes: BTreeMap::new(),
            data: KindData::Basic,
        }
    }

    /// Send the spawn packet, any stored attributes, and restore shoulder
    /// decorations for players. `valid` becomes true only once the spawn
    /// packet was accepted by the sink.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Sink`] if the spawn packet could not be sent.
    pub fn spawn(&mut self, ctx: &mut SessionContext<'_>) -> Result<(), EngineError> {
        if self.target_id.is_local_player() {
            self.valid = true;
            return Ok(());
        }

        let position = self.transform.position;
        let rotation = self.transform.rotation.to_target();
        let motion = self.transform.velocity;
        let metadata = self.metadata.snapshot();
        let packet = match &self.data {
            KindData::Player(player) => TargetPacket::AddPlayer {
                target_id: self.target_id,
                uuid: player.profile.id,
                username: player.profile.name.clone(),
                position,
                rotation,
                motion,
                metadata,
            },
            KindData::Basic => TargetPacket::AddEntity {
                target_id: self.target_id,
                identifier: self.kind.identifier().to_string(),
                position,
                rotation,
                motion,
                metadata,
            },
        };
        ctx.send(packet)?;
        self.valid = true;
        debug!(target_id = %self.target_id, kind = %self.kind, "spawned entity");

        if !self.attributes.is_empty() {
            ctx.emit(TargetPacket::UpdateAttributes {
                target_id: self.target_id,
                attributes: self.attributes.values().cloned().collect(),
            });
        }

        if matches!(self.data, KindData::Player(_)) {
            synthesizer::restore_shoulders(self, ctx);
        }
        Ok(())
    }

    /// Remove the entity from the target client and tear down everything it
    /// owns. Returns whether the orchestrator should forget the model.
    ///
    /// Players still shown on the roster are kept so that re-entering view
    /// does not lose their profile.
    pub fn despawn(&mut self, ctx: &mut SessionContext<'_>) -> bool {
        let local = self.target_id.is_local_player();
        if self.valid && !local {
            ctx.emit(TargetPacket::RemoveEntity {
                target_id: self.target_id,
            });
            self.valid = false;
        }
        match &mut self.data {
            KindData::Player(player) => {
                synthesizer::clear_all(&mut player.shoulders, ctx);
                !local && !player.roster_visible
            }
            KindData::Basic => true,
        }
    }

    /// Re-send the named metadata fields if the client already knows the
    /// entity. Before spawning, fields wait for the spawn snapshot.
    pub(crate) fn emit_metadata(&self, fields: &[TargetField], ctx: &SessionContext<'_>) {
        if !self.valid || self.target_id.is_local_player() {
            return;
        }
        let metadata = self.metadata.subset(fields);
        if metadata.is_empty() {
            return;
        }
        ctx.emit(TargetPacket::SetEntityData {
            target_id: self.target_id,
            metadata,
        });
    }

    /// Attached synthetic entities, mutably.
    pub(crate) fn attachments_mut(&mut self) -> impl Iterator<Item = &mut EntityModel> {
        let shoulders = match &mut self.data {
            KindData::Player(player) => Some(player.shoulders.occupants_mut()),
            KindData::Basic => None,
        };
        shoulders.into_iter().flatten()
    }

    /// The source ID this model is bound to, if any.
    #[must_use]
    pub fn source_id(&self) -> Option<SourceId> {
        self.source_id
    }

    /// The target-protocol ID of this entity.
    #[must_use]
    pub fn target_id(&self) -> TargetId {
        self.target_id
    }

    /// What kind of entity this is.
    #[must_use]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Stored position, rotation and velocity.
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Stored position, vertical offset included.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Whether the last move reported the entity grounded.
    #[must_use]
    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    /// Whether the target client has been sent a spawn packet.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Current translated metadata.
    #[must_use]
    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    /// A stored translated attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Player state, for player-kind models.
    #[must_use]
    pub fn player(&self) -> Option<&PlayerState> {
        match &self.data {
            KindData::Player(player) => Some(player),
            KindData::Basic => None,
        }
    }

    /// Player state, mutably.
    pub fn player_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.data {
            KindData::Player(player) => Some(player),
            KindData::Basic => None,
        }
    }

    /// Whether this is a player-kind model.
    #[must_use]
    pub fn is_player(&self) -> bool {
        matches!(self.data, KindData::Player(_))
    }
}

#[cfg(test)]
mod tests {
    use gateway_entity::{IdentifierRegistry, MetadataValue};
    use gateway_protocol::RecordingSink;
    use uuid::Uuid;

    use super::*;
    use crate::config::EngineConfig;
    use crate::scheduler::ManualScheduler;
    use crate::teams::StaticTeamDirectory;

    struct Harness {
        registry: IdentifierRegistry,
        sink: RecordingSink,
        scheduler: ManualScheduler,
        teams: StaticTeamDirectory,
        config: EngineConfig,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                registry: IdentifierRegistry::new(),
                sink: RecordingSink::new(),
                scheduler: ManualScheduler::new(),
                teams: StaticTeamDirectory::default(),
                config: EngineConfig::default(),
            }
        }

        fn ctx(&mut self) -> SessionContext<'_> {
            SessionContext::new(
                &mut self.registry,
                &self.sink,
                &self.scheduler,
                &self.teams,
                &self.config,
            )
        }
    }

    fn zombie(target: u64) -> EntityModel {
        EntityModel::new(
            Some(SourceId(10)),
            TargetId(target),
            EntityKind::Mob("minecraft:zombie".into()),
            Vec3::new(1.0, 2.0, 3.0),
            Rotation::new(90.0, 0.0, 90.0),
            Vec3::ZERO,
        )
    }

    #[test]
    fn test_spawn_sends_snapshot_and_marks_valid() {
        let mut harness = Harness::new();
        let mut model = zombie(5);
        model
            .metadata
            .set(TargetField::Air, MetadataValue::Int(300));
        assert!(!model.is_valid());

        model.spawn(&mut harness.ctx()).unwrap();
        assert!(model.is_valid());

        let packets = harness.sink.take();
        assert_eq!(packets.len(), 1);
        match &packets[0] {
            TargetPacket::AddEntity {
                target_id,
                identifier,
                rotation,
                metadata,
                ..
            } => {
                assert_eq!(*target_id, TargetId(5));
                assert_eq!(identifier, "minecraft:zombie");
                assert_eq!(*rotation, Vec3::new(0.0, 90.0, 90.0));
                assert_eq!(metadata, &vec![(TargetField::Air, MetadataValue::Int(300))]);
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn test_failed_spawn_leaves_model_invalid() {
        let mut harness = Harness::new();
        harness.sink.close();
        let mut model = zombie(5);
        assert!(model.spawn(&mut harness.ctx()).is_err());
        assert!(!model.is_valid());
    }

    #[test]
    fn test_player_position_is_offset() {
        let model = EntityModel::new_player(
            Some(SourceId(1)),
            TargetId(2),
            GameProfile::new(Uuid::new_v4(), "Alice"),
            true,
            Vec3::new(0.0, 64.0, 0.0),
            Rotation::ZERO,
            Vec3::ZERO,
        );
        assert!((model.position().y - (64.0 + EntityKind::PLAYER_EYE_HEIGHT)).abs() < 1e-4);
        assert!(model.is_player());
        assert_eq!(model.player().map(|player| player.profile().name.as_str()), Some("Alice"));
    }

    #[test]
    fn test_local_player_never_spawns() {
        let mut harness = Harness::new();
        let mut model = EntityModel::new_player(
            Some(SourceId(1)),
            TargetId::LOCAL_PLAYER,
            GameProfile::new(Uuid::new_v4(), "Me"),
            true,
            Vec3::ZERO,
            Rotation::ZERO,
            Vec3::ZERO,
        );
        assert!(model.is_valid());
        model.spawn(&mut harness.ctx()).unwrap();
        assert!(!model.despawn(&mut harness.ctx()));
        assert!(harness.sink.packets().is_empty());
    }

    #[test]
    fn test_despawn_basic_forgets() {
        let mut harness = Harness::new();
        let mut model = zombie(5);
        model.spawn(&mut harness.ctx()).unwrap();
        harness.sink.take();

        assert!(model.despawn(&mut harness.ctx()));
        assert!(!model.is_valid());
        assert_eq!(
            harness.sink.take(),
            vec![TargetPacket::RemoveEntity {
                target_id: TargetId(5)
            }]
        );
    }

    #[test]
    fn test_emit_metadata_waits_for_spawn() {
        let mut harness = Harness::new();
        let mut model = zombie(5);
        model.metadata.set(TargetField::Flags, MetadataValue::Byte(1));
        model.emit_metadata(&[TargetField::Flags], &harness.ctx());
        assert!(harness.sink.packets().is_empty());

        model.spawn(&mut harness.ctx()).unwrap();
        harness.sink.take();
        model.emit_metadata(&[TargetField::Flags], &harness.ctx());
        assert_eq!(
            harness.sink.take(),
            vec![TargetPacket::SetEntityData {
                target_id: TargetId(5),
                metadata: vec![(TargetField::Flags, MetadataValue::Byte(1))],
            }]
        );
    }
}
