//! # gateway_engine
//!
//! Entity translation and synchronisation between the source and target
//! protocols of the gateway.
//!
//! This crate provides:
//!
//! - [`EntityEngine`]: the per-session orchestrator that applies source
//!   events in order and emits target packets.
//! - [`model`]: one translated entity and its spawn/despawn lifecycle, with
//!   player state in [`player`].
//! - [`translator`], [`movement`], [`synthesizer`]: metadata translation,
//!   movement replication, and shoulder decorations.
//! - [`scheduler`]: deferred actions, with a tokio-backed and a manual
//!   scheduler.
//! - [`teams`]: the read-only team directory used for name tags.
//! - [`config`] / [`error`]: engine tunables and error types.

pub mod config;
pub mod context;
pub mod effects;
pub mod engine;
pub mod error;
pub mod links;
pub mod model;
pub mod movement;
pub mod player;
pub mod scheduler;
pub mod synthesizer;
pub mod teams;
pub mod translator;

pub use config::EngineConfig;
pub use context::SessionContext;
pub use effects::{EffectCache, EffectInstance};
pub use engine::EntityEngine;
pub use error::EngineError;
pub use links::{LinkChanges, LinkTable};
pub use model::{EntityModel, KindData};
pub use player::PlayerState;
pub use scheduler::{
    DeferredAction, DeferredScheduler, ManualScheduler, ScheduledAction, TaskKey, TokioScheduler,
};
pub use synthesizer::{ShoulderSlot, ShoulderSlots};
pub use teams::{StaticTeamDirectory, Team, TeamColor, TeamDirectory};
pub use translator::ABSORPTION_ATTRIBUTE;
