//! Engine error types.
//!
//! None of these end a session. The orchestrator logs and drops them; the
//! cost of an error is visual fidelity, never the connection.

use gateway_entity::{RegistryError, SourceId};
use gateway_protocol::ProtocolError;

use crate::scheduler::TaskKey;
use crate::synthesizer::ShoulderSlot;

/// Errors raised while translating entity events.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The event names a source entity with no live mapping: an out-of-order
    /// or duplicate event from the feed.
    #[error("no live entity for {0}")]
    UnknownSourceId(SourceId),

    /// A player spawn arrived without a profile to present it with.
    #[error("player {0} spawned without a profile")]
    MissingProfile(SourceId),

    /// The metadata field has no counterpart in the target protocol.
    #[error("metadata field {0} has no target translation")]
    UnrepresentableField(u8),

    /// A shoulder decoration could not be spawned. The slot stays empty so
    /// the next tag update retries.
    #[error("could not synthesise {slot} shoulder entity: {cause}")]
    SynthesisFailure {
        slot: ShoulderSlot,
        #[source]
        cause: ProtocolError,
    },

    /// A deferred action fired after the entities it refers to were gone.
    #[error("deferred action {0:?} is stale")]
    StaleDeferredAction(TaskKey),

    /// The session has been shut down.
    #[error("session is closed")]
    SessionClosed,

    #[error(transparent)]
    Registry(RegistryError),

    #[error(transparent)]
    Sink(#[from] ProtocolError),
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(source_id) => Self::UnknownSourceId(source_id),
            other => Self::Registry(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use gateway_entity::TargetId;

    use super::*;

    #[test]
    fn test_not_found_maps_to_unknown_source() {
        let err: EngineError = RegistryError::NotFound(SourceId(3)).into();
        assert!(matches!(err, EngineError::UnknownSourceId(SourceId(3))));
    }

    #[test]
    fn test_other_registry_errors_are_wrapped() {
        let err: EngineError = RegistryError::TargetInUse(TargetId(4)).into();
        assert!(matches!(err, EngineError::Registry(_)));
        assert_eq!(err.to_string(), "TargetId(4) is already held by a live entity");
    }
}
