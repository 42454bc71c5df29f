//! Shoulder decorations.
//!
//! In the source protocol a parrot sitting on a player's shoulder is an
//! opaque compound tag on the player. The target protocol needs a separate
//! parrot entity with its own ID, linked to the player as a rider. This
//! module materialises that entity, keeps it in step with the tag, and tears
//! it down.
//!
//! The link is emitted after [`EngineConfig::link_delay`] because clients
//! that have not yet rendered the player drop links sent any sooner.
//!
//! [`EngineConfig::link_delay`]: crate::EngineConfig::link_delay

use gateway_entity::{CompoundTag, EntityKind, MetadataValue, SourceField, TargetField, TargetId};
use gateway_math::{Transform, Vec3};
use gateway_protocol::{EntityLink, LinkType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::SessionContext;
use crate::error::EngineError;
use crate::model::{EntityModel, KindData};
use crate::scheduler::{DeferredAction, TaskKey};

/// Which shoulder a decoration sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShoulderSlot {
    Left,
    Right,
}

impl ShoulderSlot {
    pub const ALL: [ShoulderSlot; 2] = [ShoulderSlot::Left, ShoulderSlot::Right];

    #[must_use]
    pub fn from_field(field: SourceField) -> Option<Self> {
        match field {
            SourceField::LeftShoulder => Some(Self::Left),
            SourceField::RightShoulder => Some(Self::Right),
            _ => None,
        }
    }

    /// Seat position relative to the player, mirrored on the lateral axis.
    #[must_use]
    pub fn seat_offset(self) -> Vec3 {
        let lateral = match self {
            Self::Left => 0.4,
            Self::Right => -0.4,
        };
        Vec3::new(lateral, -0.22, -0.1)
    }

    #[must_use]
    pub fn link_type(self) -> LinkType {
        match self {
            Self::Left => LinkType::Rider,
            Self::Right => LinkType::Passenger,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

impl std::fmt::Display for ShoulderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// The two shoulders of a player: the last tag seen for each, and the
/// decoration currently spawned for it.
#[derive(Debug, Default)]
pub struct ShoulderSlots {
    tags: [Option<CompoundTag>; 2],
    occupants: [Option<EntityModel>; 2],
}

impl ShoulderSlots {
    /// The decoration on `slot`, if one is spawned.
    #[must_use]
    pub fn occupant(&self, slot: ShoulderSlot) -> Option<&EntityModel> {
        self.occupants[slot.index()].as_ref()
    }

    /// The last non-empty tag received for `slot`.
    #[must_use]
    pub fn tag(&self, slot: ShoulderSlot) -> Option<&CompoundTag> {
        self.tags[slot.index()].as_ref()
    }

    pub(crate) fn occupants_mut(&mut self) -> impl Iterator<Item = &mut EntityModel> {
        self.occupants.iter_mut().flatten()
    }

    #[must_use]
    pub fn occupied(&self) -> usize {
        self.occupants.iter().flatten().count()
    }
}

/// Apply a shoulder tag change to a player.
///
/// An empty or absent tag clears the slot. A tag on an empty slot spawns a
/// decoration if the player is spawned; otherwise it waits for the player's
/// spawn. A tag on an occupied slot only updates the variant.
///
/// # Errors
///
/// Returns [`EngineError::SynthesisFailure`] if the decoration could not be
/// spawned. The slot is left empty in that case.
pub(crate) fn apply_shoulder_tag(
    parent: &mut EntityModel,
    slot: ShoulderSlot,
    value: &MetadataValue,
    ctx: &mut SessionContext<'_>,
) -> Result<(), EngineError> {
    let parent_id = parent.target_id;
    let parent_valid = parent.valid;
    let transform = parent.transform;
    let KindData::Player(player) = &mut parent.data else {
        return Err(EngineError::UnrepresentableField(slot_field(slot).index()));
    };
    let shoulders = &mut player.shoulders;
    let tag = value.as_compound().cloned();
    shoulders.tags[slot.index()] = tag.clone();

    let Some(tag) = tag else {
        clear_slot(shoulders, slot, ctx);
        return Ok(());
    };
    if let Some(decoration) = shoulders.occupants[slot.index()].as_mut() {
        if let Some(variant) = tag.get_int("Variant") {
            decoration
                .metadata
                .set(TargetField::Variant, MetadataValue::Int(variant));
            decoration.emit_metadata(&[TargetField::Variant], ctx);
        }
    } else if parent_valid {
        let decoration = synthesize(parent_id, transform, slot, &tag, ctx)?;
        shoulders.occupants[slot.index()] = Some(decoration);
    }
    Ok(())
}

/// Spawn decorations for every remembered tag whose slot is empty. Called
/// right after a player spawns; failures leave the slot for the next tag.
pub(crate) fn restore_shoulders(parent: &mut EntityModel, ctx: &mut SessionContext<'_>) {
    let parent_id = parent.target_id;
    let transform = parent.transform;
    let KindData::Player(player) = &mut parent.data else {
        return;
    };
    let shoulders = &mut player.shoulders;
    for slot in ShoulderSlot::ALL {
        let index = slot.index();
        if shoulders.occupants[index].is_some() {
            continue;
        }
        let Some(tag) = shoulders.tags[index].clone() else {
            continue;
        };
        match synthesize(parent_id, transform, slot, &tag, ctx) {
            Ok(decoration) => shoulders.occupants[index] = Some(decoration),
            Err(err) => warn!(%parent_id, %slot, %err, "shoulder restore failed"),
        }
    }
}

/// Despawn both decorations. Remembered tags are kept.
pub(crate) fn clear_all(shoulders: &mut ShoulderSlots, ctx: &mut SessionContext<'_>) {
    for slot in ShoulderSlot::ALL {
        clear_slot(shoulders, slot, ctx);
    }
}

fn clear_slot(shoulders: &mut ShoulderSlots, slot: ShoulderSlot, ctx: &mut SessionContext<'_>) {
    let Some(mut decoration) = shoulders.occupants[slot.index()].take() else {
        return;
    };
    let target_id = decoration.target_id;
    ctx.scheduler.cancel(TaskKey::Link(target_id));
    decoration.despawn(ctx);
    ctx.registry.release_target(target_id);
    debug!(%target_id, %slot, "removed shoulder entity");
}

/// Allocate, spawn, and schedule the link for one decoration.
fn synthesize(
    parent_id: TargetId,
    parent_transform: Transform,
    slot: ShoulderSlot,
    tag: &CompoundTag,
    ctx: &mut SessionContext<'_>,
) -> Result<EntityModel, EngineError> {
    let target_id = ctx.registry.allocate();
    ctx.registry.track(target_id)?;

    let mut decoration = EntityModel::synthetic(target_id, EntityKind::Parrot, parent_transform);
    if let Some(variant) = tag.get_int("Variant") {
        decoration
            .metadata
            .set(TargetField::Variant, MetadataValue::Int(variant));
    }
    decoration.metadata.set(
        TargetField::RiderSeatPosition,
        MetadataValue::Position(slot.seat_offset()),
    );
    decoration
        .metadata
        .set(TargetField::RiderRotationLocked, MetadataValue::Byte(1));

    if let Err(err) = decoration.spawn(ctx) {
        ctx.registry.release_target(target_id);
        let cause = match err {
            EngineError::Sink(cause) => cause,
            other => return Err(other),
        };
        return Err(EngineError::SynthesisFailure { slot, cause });
    }

    ctx.scheduler.schedule(
        ctx.config.link_delay(),
        DeferredAction::EmitLink {
            parent: parent_id,
            child: target_id,
            slot,
        },
    );
    debug!(%parent_id, %target_id, %slot, "synthesised shoulder entity");
    Ok(decoration)
}

/// The link a fired [`DeferredAction::EmitLink`] should send, if the slot
/// still holds that child and both sides are spawned.
pub(crate) fn live_link(
    parent: &EntityModel,
    child: TargetId,
    slot: ShoulderSlot,
) -> Option<EntityLink> {
    if !parent.valid {
        return None;
    }
    let decoration = parent.player()?.shoulders.occupant(slot)?;
    if decoration.target_id != child || !decoration.valid {
        return None;
    }
    Some(EntityLink::new(parent.target_id, child, slot.link_type()))
}

fn slot_field(slot: ShoulderSlot) -> SourceField {
    match slot {
        ShoulderSlot::Left => SourceField::LeftShoulder,
        ShoulderSlot::Right => SourceField::RightShoulder,
    }
}

#[cfg(test)]
mod tests {
    use gateway_entity::{IdentifierRegistry, SourceId, TagValue};
    use gateway_math::Rotation;
    use gateway_protocol::{GameProfile, RecordingSink, TargetPacket};
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

    fn spawned_player(harness: &mut Harness) -> EntityModel {
        let target = harness.registry.allocate();
        harness.registry.bind(SourceId(42), target).unwrap();
        let mut player = EntityModel::new_player(
            Some(SourceId(42)),
            target,
            GameProfile::new(Uuid::new_v4(), "Alice"),
            true,
            Vec3::new(0.0, 64.0, 0.0),
            Rotation::ZERO,
            Vec3::ZERO,
        );
        player.spawn(&mut harness.ctx()).unwrap();
        harness.sink.take();
        player
    }

    fn parrot_tag(variant: i32) -> MetadataValue {
        MetadataValue::Compound(Some(CompoundTag::new().with("Variant", TagValue::Int(variant))))
    }

    #[test]
    fn test_slot_offsets_are_mirrored() {
        let left = ShoulderSlot::Left.seat_offset();
        let right = ShoulderSlot::Right.seat_offset();
        assert_eq!(left.x, -right.x);
        assert_eq!((left.y, left.z), (right.y, right.z));
        assert_eq!(ShoulderSlot::Left.link_type(), LinkType::Rider);
        assert_eq!(ShoulderSlot::Right.link_type(), LinkType::Passenger);
    }

    #[test]
    fn test_tag_on_empty_slot_synthesises_once() {
        let mut harness = Harness::new();
        let mut player = spawned_player(&mut harness);
        let allocated = harness.registry.allocated_count();

        apply_shoulder_tag(&mut player, ShoulderSlot::Left, &parrot_tag(2), &mut harness.ctx())
            .unwrap();

        assert_eq!(harness.registry.allocated_count(), allocated + 1);
        let spawns: Vec<_> = harness
            .sink
            .take()
            .into_iter()
            .filter(TargetPacket::is_spawn)
            .collect();
        assert_eq!(spawns.len(), 1);
        assert_eq!(harness.scheduler.len(), 1);

        let decoration = player.player().unwrap().shoulders().occupant(ShoulderSlot::Left).unwrap();
        assert_eq!(
            decoration.metadata().get(TargetField::Variant),
            Some(&MetadataValue::Int(2))
        );
        assert_eq!(
            decoration.metadata().get(TargetField::RiderRotationLocked),
            Some(&MetadataValue::Byte(1))
        );
        assert!(harness.registry.is_live(decoration.target_id()));
    }

    #[test]
    fn test_tag_on_occupied_slot_updates_variant_in_place() {
        let mut harness = Harness::new();
        let mut player = spawned_player(&mut harness);
        apply_shoulder_tag(&mut player, ShoulderSlot::Right, &parrot_tag(1), &mut harness.ctx())
            .unwrap();
        harness.sink.take();
        let allocated = harness.registry.allocated_count();

        apply_shoulder_tag(&mut player, ShoulderSlot::Right, &parrot_tag(4), &mut harness.ctx())
            .unwrap();

        assert_eq!(harness.registry.allocated_count(), allocated);
        let packets = harness.sink.take();
        assert_eq!(packets.len(), 1);
        assert!(matches!(
            &packets[0],
            TargetPacket::SetEntityData { metadata, .. }
                if metadata == &vec![(TargetField::Variant, MetadataValue::Int(4))]
        ));
    }

    #[test]
    fn test_empty_tag_clears_slot_and_cancels_link() {
        let mut harness = Harness::new();
        let mut player = spawned_player(&mut harness);
        apply_shoulder_tag(&mut player, ShoulderSlot::Left, &parrot_tag(0), &mut harness.ctx())
            .unwrap();
        let child = player
            .player()
            .unwrap()
            .shoulders()
            .occupant(ShoulderSlot::Left)
            .unwrap()
            .target_id();
        harness.sink.take();

        apply_shoulder_tag(
            &mut player,
            ShoulderSlot::Left,
            &MetadataValue::Compound(Some(CompoundTag::new())),
            &mut harness.ctx(),
        )
        .unwrap();

        assert_eq!(
            harness.sink.take(),
            vec![TargetPacket::RemoveEntity { target_id: child }]
        );
        assert!(harness.scheduler.is_empty());
        assert!(!harness.registry.is_live(child));
        assert_eq!(player.player().unwrap().shoulders().occupied(), 0);
    }

    #[test]
    fn test_failed_synthesis_leaves_slot_empty_for_retry() {
        let mut harness = Harness::new();
        let mut player = spawned_player(&mut harness);
        harness.sink.close();

        let err = apply_shoulder_tag(&mut player, ShoulderSlot::Left, &parrot_tag(3), &mut harness.ctx())
            .unwrap_err();
        assert!(matches!(err, EngineError::SynthesisFailure { slot: ShoulderSlot::Left, .. }));
        assert_eq!(player.player().unwrap().shoulders().occupied(), 0);
        assert!(harness.scheduler.is_empty());
        assert_eq!(harness.registry.live_count(), 1);

        harness.sink.reopen();
        apply_shoulder_tag(&mut player, ShoulderSlot::Left, &parrot_tag(3), &mut harness.ctx())
            .unwrap();
        assert_eq!(player.player().unwrap().shoulders().occupied(), 1);
    }

    #[test]
    fn test_tag_before_spawn_waits_for_parent() {
        let mut harness = Harness::new();
        let target = harness.registry.allocate();
        let mut player = EntityModel::new_player(
            None,
            target,
            GameProfile::new(Uuid::new_v4(), "Bob"),
            true,
            Vec3::ZERO,
            Rotation::ZERO,
            Vec3::ZERO,
        );
        apply_shoulder_tag(&mut player, ShoulderSlot::Right, &parrot_tag(1), &mut harness.ctx())
            .unwrap();
        assert_eq!(player.player().unwrap().shoulders().occupied(), 0);
        assert!(harness.sink.packets().is_empty());

        player.spawn(&mut harness.ctx()).unwrap();
        assert_eq!(player.player().unwrap().shoulders().occupied(), 1);
        assert_eq!(harness.scheduler.len(), 1);
    }

    #[test]
    fn test_live_link_requires_current_occupant() {
        let mut harness = Harness::new();
        let mut player = spawned_player(&mut harness);
        apply_shoulder_tag(&mut player, ShoulderSlot::Left, &parrot_tag(2), &mut harness.ctx())
            .unwrap();
        let child = player
            .player()
            .unwrap()
            .shoulders()
            .occupant(ShoulderSlot::Left)
            .unwrap()
            .target_id();

        let link = live_link(&player, child, ShoulderSlot::Left).unwrap();
        assert_eq!(link, EntityLink::new(player.target_id(), child, LinkType::Rider));
        assert!(live_link(&player, child, ShoulderSlot::Right).is_none());
        assert!(live_link(&player, TargetId(999), ShoulderSlot::Left).is_none());
    }
}
