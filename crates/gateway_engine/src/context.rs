//! Per-call view of the session the engine is translating for.

use gateway_entity::IdentifierRegistry;
use gateway_protocol::{PacketSink, TargetPacket};
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::scheduler::DeferredScheduler;
use crate::teams::TeamDirectory;

/// Everything an entity operation may touch besides the entity itself: the
/// identifier space, the outbound sink, the timer facility, and the team
/// directory.
pub struct SessionContext<'a> {
    pub(crate) registry: &'a mut IdentifierRegistry,
    pub(crate) sink: &'a dyn PacketSink,
    pub(crate) scheduler: &'a dyn DeferredScheduler,
    pub(crate) teams: &'a dyn TeamDirectory,
    pub(crate) config: &'a EngineConfig,
}

impl<'a> SessionContext<'a> {
    #[must_use]
    pub fn new(
        registry: &'a mut IdentifierRegistry,
        sink: &'a dyn PacketSink,
        scheduler: &'a dyn DeferredScheduler,
        teams: &'a dyn TeamDirectory,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            registry,
            sink,
            scheduler,
            teams,
            config,
        }
    }

    /// Send a packet whose delivery the caller depends on.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Sink`] if the target connection is closed.
    pub fn send(&self, packet: TargetPacket) -> Result<(), EngineError> {
        self.sink.send(packet)?;
        Ok(())
    }

    /// Send a packet fire-and-forget. A closed sink is logged, not reported.
    pub fn emit(&self, packet: TargetPacket) {
        let name = packet.name();
        let target_id = packet.target_id();
        if let Err(err) = self.sink.send(packet) {
            warn!(packet = name, ?target_id, %err, "dropping outbound packet");
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn registry(&mut self) -> &mut IdentifierRegistry {
        self.registry
    }
}
