//! Movement replication.
//!
//! Both move flavours update the model first and then send one absolute
//! movement packet, because the target protocol has no relative move for
//! the entities we translate. Attached decorations follow their parent to
//! the same stored position and rotation and are always grounded.

use gateway_math::{Rotation, Vec3};
use gateway_protocol::{MoveMode, TargetPacket};

use crate::context::SessionContext;
use crate::model::EntityModel;

/// Move to an absolute source-protocol position.
pub fn move_absolute(
    model: &mut EntityModel,
    position: Vec3,
    rotation: Rotation,
    on_ground: bool,
    teleported: bool,
    ctx: &SessionContext<'_>,
) {
    let offset = model.kind.vertical_offset();
    model.transform.set_position(position, offset);
    model.transform.rotation = rotation;
    model.on_ground = on_ground;
    replicate(model, teleported, ctx);
}

/// Move by a source-protocol delta.
pub fn move_relative(
    model: &mut EntityModel,
    delta: Vec3,
    rotation: Rotation,
    on_ground: bool,
    ctx: &SessionContext<'_>,
) {
    model.transform.translate(delta);
    model.transform.rotation = rotation;
    model.on_ground = on_ground;
    replicate(model, false, ctx);
}

/// Replace the entity's velocity and tell the client.
pub fn set_velocity(model: &mut EntityModel, velocity: Vec3, ctx: &SessionContext<'_>) {
    model.transform.velocity = velocity;
    if model.valid && !model.target_id.is_local_player() {
        ctx.emit(TargetPacket::SetEntityMotion {
            target_id: model.target_id,
            motion: velocity,
        });
    }
}

fn replicate(model: &mut EntityModel, teleported: bool, ctx: &SessionContext<'_>) {
    send_move(model, teleported, ctx);

    let position = model.transform.position;
    let rotation = model.transform.rotation;
    for attachment in model.attachments_mut() {
        attachment.transform.position = position;
        attachment.transform.rotation = rotation;
        attachment.on_ground = true;
        send_move(attachment, teleported, ctx);
    }
}

fn send_move(model: &EntityModel, teleported: bool, ctx: &SessionContext<'_>) {
    if !model.valid || model.target_id.is_local_player() {
        return;
    }
    let position = model.transform.position;
    let rotation = model.transform.rotation.to_target();
    let packet = if model.is_player() {
        TargetPacket::MovePlayer {
            target_id: model.target_id,
            position,
            rotation,
            on_ground: model.on_ground,
            mode: if teleported {
                MoveMode::Teleport
            } else {
                MoveMode::Normal
            },
        }
    } else {
        TargetPacket::MoveEntityAbsolute {
            target_id: model.target_id,
            position,
            rotation,
            on_ground: model.on_ground,
            teleported,
        }
    };
    ctx.emit(packet);
}

#[cfg(test)]
mod tests {
    use gateway_entity::{
        CompoundTag, EntityKind, IdentifierRegistry, MetadataValue, SourceField, SourceId, TagValue,
        TargetId,
    };
    use gateway_protocol::{GameProfile, RecordingSink};
    use uuid::Uuid;

    use super::*;
    use crate::config::EngineConfig;
    use crate::scheduler::ManualScheduler;
    use crate::teams::StaticTeamDirectory;
    use crate::translator::apply_metadata;

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

    fn player_with_parrots(harness: &mut Harness) -> EntityModel {
        let target = harness.registry.allocate();
        harness.registry.bind(SourceId(42), target).unwrap();
        let mut player = EntityModel::new_player(
            Some(SourceId(42)),
            target,
            GameProfile::new(Uuid::new_v4(), "Alice"),
            true,
            Vec3::ZERO,
            Rotation::ZERO,
            Vec3::ZERO,
        );
        player.spawn(&mut harness.ctx()).unwrap();
        for field in [SourceField::LeftShoulder, SourceField::RightShoulder] {
            let tag = CompoundTag::new().with("Variant", TagValue::Int(1));
            apply_metadata(
                &mut player,
                field,
                MetadataValue::Compound(Some(tag)),
                &mut harness.ctx(),
            )
            .unwrap();
        }
        harness.sink.take();
        player
    }

    #[test]
    fn test_move_absolute_propagates_to_both_shoulders() {
        let mut harness = Harness::new();
        let mut player = player_with_parrots(&mut harness);
        let parent = player.target_id();

        let rotation = Rotation::new(45.0, 10.0, 50.0);
        move_absolute(
            &mut player,
            Vec3::new(5.0, 70.0, -3.0),
            rotation,
            false,
            true,
            &harness.ctx(),
        );

        let expected = Vec3::new(5.0, 70.0 + EntityKind::PLAYER_EYE_HEIGHT, -3.0);
        let packets = harness.sink.take();
        assert_eq!(packets.len(), 3);
        match &packets[0] {
            TargetPacket::MovePlayer {
                target_id,
                position,
                on_ground,
                mode,
                ..
            } => {
                assert_eq!(*target_id, parent);
                assert_eq!(*position, expected);
                assert!(!on_ground);
                assert_eq!(*mode, MoveMode::Teleport);
            }
            other => panic!("unexpected packet {other:?}"),
        }
        for packet in &packets[1..] {
            match packet {
                TargetPacket::MoveEntityAbsolute {
                    target_id,
                    position,
                    rotation: sent,
                    on_ground,
                    teleported,
                } => {
                    assert_ne!(*target_id, parent);
                    assert_eq!(*position, expected);
                    assert_eq!(*sent, rotation.to_target());
                    assert!(on_ground);
                    assert!(teleported);
                }
                other => panic!("unexpected packet {other:?}"),
            }
        }
    }

    #[test]
    fn test_move_relative_translates_stored_position() {
        let mut harness = Harness::new();
        let mut mob = EntityModel::new(
            Some(SourceId(3)),
            TargetId(4),
            EntityKind::Mob("minecraft:pig".into()),
            Vec3::new(1.0, 1.0, 1.0),
            Rotation::ZERO,
            Vec3::ZERO,
        );
        mob.spawn(&mut harness.ctx()).unwrap();
        harness.sink.take();

        move_relative(&mut mob, Vec3::new(0.5, 0.0, -1.0), Rotation::ZERO, true, &harness.ctx());

        assert_eq!(mob.position(), Vec3::new(1.5, 1.0, 0.0));
        assert_eq!(
            harness.sink.take(),
            vec![TargetPacket::MoveEntityAbsolute {
                target_id: TargetId(4),
                position: Vec3::new(1.5, 1.0, 0.0),
                rotation: Vec3::ZERO,
                on_ground: true,
                teleported: false,
            }]
        );
    }

    #[test]
    fn test_unspawned_entity_moves_silently() {
        let mut harness = Harness::new();
        let mut mob = EntityModel::new(
            Some(SourceId(3)),
            TargetId(4),
            EntityKind::Mob("minecraft:pig".into()),
            Vec3::ZERO,
            Rotation::ZERO,
            Vec3::ZERO,
        );
        move_absolute(&mut mob, Vec3::ONE, Rotation::ZERO, true, false, &harness.ctx());
        set_velocity(&mut mob, Vec3::X, &harness.ctx());
        assert!(harness.sink.packets().is_empty());
        assert_eq!(mob.position(), Vec3::ONE);
        assert_eq!(mob.transform().velocity, Vec3::X);
    }

    #[test]
    fn test_set_velocity_on_spawned_entity() {
        let mut harness = Harness::new();
        let mut player = player_with_parrots(&mut harness);
        set_velocity(&mut player, Vec3::new(0.0, 0.4, 0.0), &harness.ctx());
        assert_eq!(
            harness.sink.take(),
            vec![TargetPacket::SetEntityMotion {
                target_id: player.target_id(),
                motion: Vec3::new(0.0, 0.4, 0.0),
            }]
        );
    }
}
