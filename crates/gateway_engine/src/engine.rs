//! The per-session entity translation engine.
//!
//! [`EntityEngine`] owns the identifier registry and every translated entity
//! of one session. Source events are applied strictly in arrival order by a
//! single caller; see `gateway_app::session` for the actor that drives it.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_entity::{
    EntityKind, IdentifierRegistry, MetadataValue, SourceField, SourceId, TargetId,
};
use gateway_math::{Rotation, Vec3};
use gateway_protocol::{GameProfile, PacketSink, SourceEvent, TargetPacket};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::context::SessionContext;
use crate::error::EngineError;
use crate::links::LinkTable;
use crate::model::EntityModel;
use crate::scheduler::{DeferredAction, DeferredScheduler, TaskKey};
use crate::teams::TeamDirectory;
use crate::{movement, synthesizer, translator};

/// The collaborators every entity operation borrows.
struct Session {
    config: EngineConfig,
    registry: IdentifierRegistry,
    sink: Arc<dyn PacketSink>,
    scheduler: Arc<dyn DeferredScheduler>,
    teams: Arc<dyn TeamDirectory>,
}

impl Session {
    fn ctx(&mut self) -> SessionContext<'_> {
        SessionContext::new(
            &mut self.registry,
            self.sink.as_ref(),
            self.scheduler.as_ref(),
            self.teams.as_ref(),
            &self.config,
        )
    }
}

/// Translation state of one session.
pub struct EntityEngine {
    session: Session,
    /// Every model the session knows, spawned or remembered.
    entities: HashMap<TargetId, EntityModel>,
    /// Remote players by account identifier. The local player is not listed.
    players_by_uuid: HashMap<Uuid, TargetId>,
    links: LinkTable,
    alive: bool,
}

impl EntityEngine {
    /// Create the engine for one session.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        sink: Arc<dyn PacketSink>,
        scheduler: Arc<dyn DeferredScheduler>,
        teams: Arc<dyn TeamDirectory>,
    ) -> Self {
        Self {
            session: Session {
                config,
                registry: IdentifierRegistry::new(),
                sink,
                scheduler,
                teams,
            },
            entities: HashMap::new(),
            players_by_uuid: HashMap::new(),
            links: LinkTable::new(),
            alive: true,
        }
    }

    /// Apply one source event. Errors are logged and dropped; none of them
    /// end the session.
    pub fn handle_event(&mut self, event: SourceEvent) {
        let result = match event {
            SourceEvent::JoinGame { source_id, profile } => {
                self.register_local_player(source_id, profile).map(drop)
            }
            SourceEvent::PlayerInfo { profile, listed } => {
                self.announce_player(profile, listed).map(drop)
            }
            SourceEvent::PlayerInfoRemove { uuid } => self.remove_player_info(uuid),
            SourceEvent::Spawn {
                source_id,
                kind,
                position,
                rotation,
                velocity,
                profile,
            } => self
                .spawn(source_id, kind, position, rotation, velocity, profile)
                .map(drop),
            SourceEvent::Despawn { source_id } => self.despawn(source_id).map(drop),
            SourceEvent::Metadata {
                source_id,
                field,
                value,
            } => self.apply_metadata(source_id, field, value),
            SourceEvent::MoveAbsolute {
                source_id,
                position,
                rotation,
                on_ground,
                teleported,
            } => self.move_absolute(source_id, position, rotation, on_ground, teleported),
            SourceEvent::MoveRelative {
                source_id,
                delta,
                rotation,
                on_ground,
            } => self.move_relative(source_id, delta, rotation, on_ground),
            SourceEvent::Velocity {
                source_id,
                velocity,
            } => self.set_velocity(source_id, velocity),
            SourceEvent::SetPassengers {
                vehicle,
                passengers,
            } => self.set_passengers(vehicle, &passengers),
            SourceEvent::Effect {
                source_id,
                effect_id,
                amplifier,
                duration_ticks,
            } => self.apply_effect(source_id, effect_id, amplifier, duration_ticks),
            SourceEvent::RemoveEffect {
                source_id,
                effect_id,
            } => self.remove_effect(source_id, effect_id),
        };
        if let Err(err) = result {
            log_absorbed(&err);
        }
    }

    /// Bind the viewer's own entity to [`TargetId::LOCAL_PLAYER`]. The local
    /// player is never spawned or despawned towards its own client.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionClosed`] after shutdown, or a registry
    /// error if `source_id` is already bound to another entity.
    pub fn register_local_player(
        &mut self,
        source_id: SourceId,
        profile: GameProfile,
    ) -> Result<TargetId, EngineError> {
        self.ensure_alive()?;
        let target_id = TargetId::LOCAL_PLAYER;
        let mut ctx = self.session.ctx();
        // A rejoin replaces the old model; its decorations go with it.
        if let Some(mut previous) = self.entities.remove(&target_id) {
            previous.despawn(&mut ctx);
            if let Some(previous_source) = previous.source_id {
                ctx.registry.release(previous_source);
            }
            self.links.remove_involving(target_id);
            debug!(%source_id, "replacing local player");
        }
        ctx.registry.bind(source_id, target_id)?;
        let model = EntityModel::new_player(
            Some(source_id),
            target_id,
            profile,
            true,
            Vec3::ZERO,
            Rotation::ZERO,
            Vec3::ZERO,
        );
        self.entities.insert(target_id, model);
        info!(%source_id, "registered local player");
        Ok(target_id)
    }

    /// Record a player profile ahead of its spawn. Listed players are added
    /// to the roster right away.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionClosed`] after shutdown.
    pub fn announce_player(
        &mut self,
        profile: GameProfile,
        listed: bool,
    ) -> Result<TargetId, EngineError> {
        self.ensure_alive()?;
        let is_local = self
            .entities
            .get(&TargetId::LOCAL_PLAYER)
            .and_then(EntityModel::player)
            .is_some_and(|local| local.profile.id == profile.id);
        if is_local {
            return Ok(TargetId::LOCAL_PLAYER);
        }
        let ctx = self.session.ctx();

        if let Some(&target_id) = self.players_by_uuid.get(&profile.id)
            && let Some(player) = self
                .entities
                .get_mut(&target_id)
                .and_then(EntityModel::player_mut)
        {
            player.profile = profile;
            player.roster_visible = listed;
            if listed {
                ctx.scheduler.cancel(TaskKey::RosterRemoval(target_id));
                player.add_to_roster(target_id, &ctx);
            } else if player.roster_added {
                player.schedule_roster_removal(target_id, &ctx);
            }
            return Ok(target_id);
        }

        let target_id = ctx.registry.allocate();
        ctx.registry.track(target_id)?;
        let uuid = profile.id;
        let mut model = EntityModel::new_player(
            None,
            target_id,
            profile,
            listed,
            Vec3::ZERO,
            Rotation::ZERO,
            Vec3::ZERO,
        );
        if listed && let Some(player) = model.player_mut() {
            player.add_to_roster(target_id, &ctx);
        }
        self.entities.insert(target_id, model);
        self.players_by_uuid.insert(uuid, target_id);
        debug!(%target_id, %uuid, listed, "announced player");
        Ok(target_id)
    }

    /// The source withdrew a profile: take it off the roster and drop the
    /// model unless it is still rendered.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionClosed`] after shutdown.
    pub fn remove_player_info(&mut self, uuid: Uuid) -> Result<(), EngineError> {
        self.ensure_alive()?;
        let Some(&target_id) = self.players_by_uuid.get(&uuid) else {
            debug!(%uuid, "removal for unknown profile");
            return Ok(());
        };
        let ctx = self.session.ctx();
        let Some(model) = self.entities.get_mut(&target_id) else {
            return Ok(());
        };
        ctx.scheduler.cancel(TaskKey::RosterRemoval(target_id));
        if let Some(player) = model.player_mut() {
            player.remove_from_roster(&ctx);
        }
        if !model.valid {
            self.forget(target_id);
        }
        Ok(())
    }

    /// Create the target entity for a source spawn and send it to the
    /// client.
    ///
    /// A source ID that is still bound is treated as a missed despawn and
    /// the old entity is removed first. A player whose profile is already
    /// known keeps the target ID it was given.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingProfile`] for a player without a profile.
    /// - [`EngineError::Sink`] if the spawn packet could not be sent. The
    ///   model is kept, unspawned.
    pub fn spawn(
        &mut self,
        source_id: SourceId,
        kind: EntityKind,
        position: Vec3,
        rotation: Rotation,
        velocity: Vec3,
        profile: Option<GameProfile>,
    ) -> Result<TargetId, EngineError> {
        self.ensure_alive()?;
        if let Ok(existing) = self.session.registry.resolve(source_id) {
            if existing.is_local_player() {
                debug!(%source_id, "ignoring spawn of the local player");
                return Ok(existing);
            }
            debug!(%source_id, target_id = %existing, "source id reused before despawn");
            self.despawn(source_id)?;
        }

        let target_id = if kind.is_player() {
            let profile = profile.ok_or(EngineError::MissingProfile(source_id))?;
            self.place_player(source_id, profile, position, rotation, velocity)?
        } else {
            let target_id = self.session.registry.allocate();
            self.session.registry.bind(source_id, target_id)?;
            let model = EntityModel::new(
                Some(source_id),
                target_id,
                kind,
                position,
                rotation,
                velocity,
            );
            self.entities.insert(target_id, model);
            target_id
        };
        self.spawn_model(target_id)?;
        Ok(target_id)
    }

    /// Remove the entity from the client. Returns whether its model was
    /// forgotten; remembered players keep their target ID, unbound from the
    /// source.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSourceId`] if nothing is bound to
    /// `source_id`.
    pub fn despawn(&mut self, source_id: SourceId) -> Result<bool, EngineError> {
        self.ensure_alive()?;
        let target_id = self.session.registry.resolve(source_id)?;
        let mut ctx = self.session.ctx();
        let model = self
            .entities
            .get_mut(&target_id)
            .ok_or(EngineError::UnknownSourceId(source_id))?;

        let forget = model.despawn(&mut ctx);
        if !forget && !target_id.is_local_player() {
            model.source_id = None;
            ctx.registry.release(source_id);
            ctx.registry.track(target_id)?;
        }
        if !target_id.is_local_player() {
            self.links.remove_involving(target_id);
        }
        if forget {
            self.forget(target_id);
        }
        debug!(%source_id, %target_id, forget, "despawned entity");
        Ok(forget)
    }

    /// Translate a metadata change.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSourceId`], or whatever the translator
    /// reports for the field.
    pub fn apply_metadata(
        &mut self,
        source_id: SourceId,
        field: SourceField,
        value: MetadataValue,
    ) -> Result<(), EngineError> {
        self.ensure_alive()?;
        let target_id = self.session.registry.resolve(source_id)?;
        let mut ctx = self.session.ctx();
        let model = self
            .entities
            .get_mut(&target_id)
            .ok_or(EngineError::UnknownSourceId(source_id))?;
        translator::apply_metadata(model, field, value, &mut ctx)
    }

    /// Move an entity to an absolute source position, dragging its
    /// decorations along.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSourceId`] if nothing is bound to
    /// `source_id`.
    pub fn move_absolute(
        &mut self,
        source_id: SourceId,
        position: Vec3,
        rotation: Rotation,
        on_ground: bool,
        teleported: bool,
    ) -> Result<(), EngineError> {
        self.ensure_alive()?;
        let target_id = self.session.registry.resolve(source_id)?;
        let ctx = self.session.ctx();
        let model = self
            .entities
            .get_mut(&target_id)
            .ok_or(EngineError::UnknownSourceId(source_id))?;
        movement::move_absolute(model, position, rotation, on_ground, teleported, &ctx);
        Ok(())
    }

    /// Move an entity by a source-protocol delta.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSourceId`] if nothing is bound to
    /// `source_id`.
    pub fn move_relative(
        &mut self,
        source_id: SourceId,
        delta: Vec3,
        rotation: Rotation,
        on_ground: bool,
    ) -> Result<(), EngineError> {
        self.ensure_alive()?;
        let target_id = self.session.registry.resolve(source_id)?;
        let ctx = self.session.ctx();
        let model = self
            .entities
            .get_mut(&target_id)
            .ok_or(EngineError::UnknownSourceId(source_id))?;
        movement::move_relative(model, delta, rotation, on_ground, &ctx);
        Ok(())
    }

    /// Replace an entity's velocity.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSourceId`] if nothing is bound to
    /// `source_id`.
    pub fn set_velocity(&mut self, source_id: SourceId, velocity: Vec3) -> Result<(), EngineError> {
        self.ensure_alive()?;
        let target_id = self.session.registry.resolve(source_id)?;
        let ctx = self.session.ctx();
        let model = self
            .entities
            .get_mut(&target_id)
            .ok_or(EngineError::UnknownSourceId(source_id))?;
        movement::set_velocity(model, velocity, &ctx);
        Ok(())
    }

    /// Replace the passengers of a vehicle. Passengers the session does not
    /// know are skipped. Links are only sent once both ends are spawned.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSourceId`] if the vehicle is unknown.
    pub fn set_passengers(
        &mut self,
        vehicle: SourceId,
        passengers: &[SourceId],
    ) -> Result<(), EngineError> {
        self.ensure_alive()?;
        let vehicle_id = self.session.registry.resolve(vehicle)?;
        let passenger_ids = passengers
            .iter()
            .filter_map(|&passenger| match self.session.registry.resolve(passenger) {
                Ok(target_id) => Some(target_id),
                Err(_) => {
                    debug!(%vehicle, %passenger, "skipping unknown passenger");
                    None
                }
            })
            .collect();
        let changes = self.links.set_passengers(vehicle_id, passenger_ids);

        let ctx = self.session.ctx();
        let spawned = |target_id: TargetId| self.entities.get(&target_id).is_some_and(|model| model.valid);
        for link in changes.removed.into_iter().chain(changes.added) {
            if spawned(link.parent) && spawned(link.child) {
                ctx.emit(TargetPacket::SetEntityLink { link });
            }
        }
        Ok(())
    }

    /// Record a status effect on a player. Other kinds carry no effects.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSourceId`] if nothing is bound to
    /// `source_id`.
    pub fn apply_effect(
        &mut self,
        source_id: SourceId,
        effect_id: i32,
        amplifier: i32,
        duration_ticks: i32,
    ) -> Result<(), EngineError> {
        self.ensure_alive()?;
        let player = self.player_for_source(source_id)?;
        if let Some(player) = player {
            player.effects.set(effect_id, amplifier, duration_ticks);
        }
        Ok(())
    }

    /// Drop a status effect from a player.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSourceId`] if nothing is bound to
    /// `source_id`.
    pub fn remove_effect(&mut self, source_id: SourceId, effect_id: i32) -> Result<(), EngineError> {
        self.ensure_alive()?;
        if let Some(player) = self.player_for_source(source_id)? {
            player.effects.remove(effect_id);
        }
        Ok(())
    }

    /// Apply an action whose delay has elapsed, against the current state.
    ///
    /// # Errors
    ///
    /// - [`EngineError::SessionClosed`] if the session was shut down.
    /// - [`EngineError::StaleDeferredAction`] if what the action refers to
    ///   is gone. Nothing is sent in either case.
    pub fn run_deferred(&mut self, action: DeferredAction) -> Result<(), EngineError> {
        self.ensure_alive()?;
        let key = action.key();
        let ctx = self.session.ctx();
        match action {
            DeferredAction::EmitLink {
                parent,
                child,
                slot,
            } => {
                let link = self
                    .entities
                    .get(&parent)
                    .and_then(|model| synthesizer::live_link(model, child, slot))
                    .ok_or(EngineError::StaleDeferredAction(key))?;
                ctx.emit(TargetPacket::SetEntityLink { link });
            }
            DeferredAction::RemoveFromRoster { target_id, uuid } => {
                let player = self
                    .entities
                    .get_mut(&target_id)
                    .and_then(EntityModel::player_mut)
                    .filter(|player| {
                        player.profile.id == uuid && !player.roster_visible && player.roster_added
                    })
                    .ok_or(EngineError::StaleDeferredAction(key))?;
                player.withdraw_from_roster(&ctx);
            }
        }
        Ok(())
    }

    /// End the session: pending deferred actions are cancelled, later ones
    /// are ignored, and all entity state is released. Nothing is sent.
    pub fn shutdown(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.session.scheduler.cancel_all();
        self.entities.clear();
        self.players_by_uuid.clear();
        self.links.clear();
        self.session.registry.clear();
        info!("session shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has not been called yet.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// The tunables this session runs with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.session.config
    }

    /// The session's identifier registry.
    #[must_use]
    pub fn registry(&self) -> &IdentifierRegistry {
        &self.session.registry
    }

    /// Source-driven passenger links.
    #[must_use]
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    /// The model holding `target_id`.
    #[must_use]
    pub fn entity(&self, target_id: TargetId) -> Option<&EntityModel> {
        self.entities.get(&target_id)
    }

    /// The model currently bound to `source_id`.
    #[must_use]
    pub fn entity_for_source(&self, source_id: SourceId) -> Option<&EntityModel> {
        let target_id = self.session.registry.resolve(source_id).ok()?;
        self.entities.get(&target_id)
    }

    /// The model of a remote player by account identifier.
    #[must_use]
    pub fn player_by_uuid(&self, uuid: Uuid) -> Option<&EntityModel> {
        self.entities.get(self.players_by_uuid.get(&uuid)?)
    }

    /// Number of models held, spawned or remembered.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn ensure_alive(&self) -> Result<(), EngineError> {
        if self.alive {
            Ok(())
        } else {
            Err(EngineError::SessionClosed)
        }
    }

    /// Bind `source_id` to the player with `profile`, reusing the target ID
    /// of an announced or remembered model.
    fn place_player(
        &mut self,
        source_id: SourceId,
        profile: GameProfile,
        position: Vec3,
        rotation: Rotation,
        velocity: Vec3,
    ) -> Result<TargetId, EngineError> {
        let uuid = profile.id;
        let mut ctx = self.session.ctx();

        if let Some(&target_id) = self.players_by_uuid.get(&uuid)
            && let Some(model) = self.entities.get_mut(&target_id)
        {
            // Still rendered under an older source ID.
            if let Some(previous) = model.source_id.take() {
                model.despawn(&mut ctx);
                ctx.registry.release(previous);
                self.links.remove_involving(target_id);
            }
            ctx.registry.bind(source_id, target_id)?;
            model.source_id = Some(source_id);
            let offset = model.kind.vertical_offset();
            model.transform.set_position(position, offset);
            model.transform.rotation = rotation;
            model.transform.velocity = velocity;
            if let Some(player) = model.player_mut() {
                player.profile = profile;
            }
            return Ok(target_id);
        }

        let target_id = ctx.registry.allocate();
        ctx.registry.bind(source_id, target_id)?;
        let model = EntityModel::new_player(
            Some(source_id),
            target_id,
            profile,
            true,
            position,
            rotation,
            velocity,
        );
        self.entities.insert(target_id, model);
        self.players_by_uuid.insert(uuid, target_id);
        Ok(target_id)
    }

    /// Roster entry, spawn packet, roster withdrawal for unlisted players,
    /// then any source links that were waiting for this entity.
    fn spawn_model(&mut self, target_id: TargetId) -> Result<(), EngineError> {
        let mut ctx = self.session.ctx();
        let Some(model) = self.entities.get_mut(&target_id) else {
            return Ok(());
        };
        if model.is_player() {
            translator::refresh_name_tag(model, &ctx);
            if let Some(player) = model.player_mut() {
                player.add_to_roster(target_id, &ctx);
            }
        }
        model.spawn(&mut ctx)?;
        if let Some(player) = model.player() {
            player.schedule_roster_removal(target_id, &ctx);
        }

        let spawned = |id: TargetId| self.entities.get(&id).is_some_and(|model| model.valid);
        for link in self.links.involving(target_id) {
            if spawned(link.parent) && spawned(link.child) {
                ctx.emit(TargetPacket::SetEntityLink { link });
            }
        }
        Ok(())
    }

    /// Drop a model and everything keyed by its target ID.
    fn forget(&mut self, target_id: TargetId) {
        let Some(mut model) = self.entities.remove(&target_id) else {
            return;
        };
        let ctx = self.session.ctx();
        ctx.scheduler.cancel(TaskKey::RosterRemoval(target_id));
        if let Some(player) = model.player_mut() {
            if player.roster_added {
                player.withdraw_from_roster(&ctx);
            }
            if self.players_by_uuid.get(&player.profile.id) == Some(&target_id) {
                self.players_by_uuid.remove(&player.profile.id);
            }
        }
        self.links.remove_involving(target_id);
        ctx.registry.release_target(target_id);
    }

    fn player_for_source(
        &mut self,
        source_id: SourceId,
    ) -> Result<Option<&mut crate::player::PlayerState>, EngineError> {
        let target_id = self.session.registry.resolve(source_id)?;
        let model = self
            .entities
            .get_mut(&target_id)
            .ok_or(EngineError::UnknownSourceId(source_id))?;
        Ok(model.player_mut())
    }
}

fn log_absorbed(err: &EngineError) {
    match err {
        EngineError::UnrepresentableField(_)
        | EngineError::StaleDeferredAction(_)
        | EngineError::SessionClosed => debug!(%err, "dropped event"),
        _ => warn!(%err, "dropped event"),
    }
}
