//! Identifier registry: the bijection between source and target IDs.
//!
//! Every live source-protocol entity is bound to exactly one target ID.
//! Synthetic entities, which exist only in the target protocol, are tracked
//! under their target ID alone.

use std::collections::{HashMap, HashSet};

use crate::entity::{SourceId, TargetId, TargetIdAllocator};
use crate::error::RegistryError;

/// Bidirectional mapping between source and target identifiers for one
/// session.
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    allocator: TargetIdAllocator,
    source_to_target: HashMap<SourceId, TargetId>,
    target_to_source: HashMap<TargetId, SourceId>,
    /// Target IDs held by entities without a source counterpart.
    unbound: HashSet<TargetId>,
}

impl IdentifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh target ID. The ID is not live until it is bound or
    /// tracked.
    pub fn allocate(&mut self) -> TargetId {
        self.allocator.allocate()
    }

    /// Binds a source ID to a target ID.
    ///
    /// Re-binding an existing pair is a no-op. A target ID previously tracked
    /// as unbound (e.g. a player announced before spawning) is promoted to a
    /// bound mapping.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyBound`] if the source ID maps to another
    /// target, or [`RegistryError::TargetInUse`] if the target ID belongs to
    /// another source.
    pub fn bind(&mut self, source_id: SourceId, target_id: TargetId) -> Result<(), RegistryError> {
        if let Some(&existing) = self.source_to_target.get(&source_id) {
            if existing == target_id {
                return Ok(());
            }
            return Err(RegistryError::AlreadyBound {
                source_id,
                target_id: existing,
            });
        }
        if self.target_to_source.contains_key(&target_id) {
            return Err(RegistryError::TargetInUse(target_id));
        }
        self.unbound.remove(&target_id);
        self.source_to_target.insert(source_id, target_id);
        self.target_to_source.insert(target_id, source_id);
        Ok(())
    }

    /// Marks a target ID as live without any source binding.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TargetInUse`] if the ID is already live.
    pub fn track(&mut self, target_id: TargetId) -> Result<(), RegistryError> {
        if self.is_live(target_id) {
            return Err(RegistryError::TargetInUse(target_id));
        }
        self.unbound.insert(target_id);
        Ok(())
    }

    /// Resolves a source ID to its target ID.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the source ID is not bound.
    pub fn resolve(&self, source_id: SourceId) -> Result<TargetId, RegistryError> {
        self.source_to_target
            .get(&source_id)
            .copied()
            .ok_or(RegistryError::NotFound(source_id))
    }

    /// Resolves a target ID back to the source ID it is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TargetNotFound`] for unbound or dead IDs.
    pub fn resolve_by_target(&self, target_id: TargetId) -> Result<SourceId, RegistryError> {
        self.target_to_source
            .get(&target_id)
            .copied()
            .ok_or(RegistryError::TargetNotFound(target_id))
    }

    /// Removes both directions of a source binding. Returns the target ID
    /// that was bound, if any.
    pub fn release(&mut self, source_id: SourceId) -> Option<TargetId> {
        let target_id = self.source_to_target.remove(&source_id)?;
        self.target_to_source.remove(&target_id);
        Some(target_id)
    }

    /// Releases a target ID regardless of how it is held.
    ///
    /// Returns `true` if the ID was live.
    pub fn release_target(&mut self, target_id: TargetId) -> bool {
        if self.unbound.remove(&target_id) {
            return true;
        }
        match self.target_to_source.remove(&target_id) {
            Some(source_id) => {
                self.source_to_target.remove(&source_id);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if some live entity holds this target ID.
    #[must_use]
    pub fn is_live(&self, target_id: TargetId) -> bool {
        self.unbound.contains(&target_id) || self.target_to_source.contains_key(&target_id)
    }

    /// Number of live target IDs, bound and unbound.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.target_to_source.len() + self.unbound.len()
    }

    /// Number of target IDs allocated over the session.
    #[must_use]
    pub fn allocated_count(&self) -> u64 {
        self.allocator.count()
    }

    /// Drops every mapping. The allocator keeps counting so IDs from before
    /// the clear are never handed out again.
    pub fn clear(&mut self) {
        self.source_to_target.clear();
        self.target_to_source.clear();
        self.unbound.clear();
    }
}
