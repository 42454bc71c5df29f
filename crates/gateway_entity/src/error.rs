//! Identifier registry error types.

use crate::entity::{SourceId, TargetId};

/// Errors raised by the [`IdentifierRegistry`](crate::IdentifierRegistry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No live mapping exists for the source identifier.
    #[error("no live mapping for {0}")]
    NotFound(SourceId),

    /// No live entity holds the target identifier.
    #[error("no live entity holds {0}")]
    TargetNotFound(TargetId),

    /// The source identifier is already bound to a different target.
    #[error("{source_id} is already bound to {target_id}")]
    AlreadyBound {
        source_id: SourceId,
        target_id: TargetId,
    },

    /// The target identifier is already held by another live entity.
    #[error("{0} is already held by a live entity")]
    TargetInUse(TargetId),
}
