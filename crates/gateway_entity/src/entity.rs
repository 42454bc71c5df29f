//! Entity identifiers and target ID allocation.
//!
//! A [`SourceId`] is assigned by the upstream server and is authoritative. A
//! [`TargetId`] is allocated by the gateway and is the only identifier the
//! downstream client ever sees.

use serde::{Deserialize, Serialize};

/// Entity identifier in the source protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub i32);

impl SourceId {
    #[must_use]
    pub const fn id(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

/// Entity identifier in the target protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl TargetId {
    /// The null / invalid identifier sentinel.
    pub const INVALID: TargetId = TargetId(0);

    /// Reserved for the local viewer. The client already knows itself, so an
    /// entity holding this identifier is never spawned or removed.
    pub const LOCAL_PLAYER: TargetId = TargetId(1);

    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) identifier.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    #[must_use]
    pub const fn is_local_player(self) -> bool {
        self.0 == Self::LOCAL_PLAYER.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TargetId({})", self.0)
    }
}

/// Allocates monotonically increasing target IDs.
///
/// IDs are never recycled within a session, so a stale reference can never
/// alias a newer entity.
#[derive(Debug)]
pub struct TargetIdAllocator {
    next_id: u64,
}

impl TargetIdAllocator {
    /// First identifier handed out; `0` is [`TargetId::INVALID`] and `1` is
    /// [`TargetId::LOCAL_PLAYER`].
    pub const FIRST: u64 = 2;

    #[must_use]
    pub fn new() -> Self {
        Self { next_id: Self::FIRST }
    }

    /// Allocates a fresh target ID.
    pub fn allocate(&mut self) -> TargetId {
        let id = self.next_id;
        self.next_id += 1;
        TargetId(id)
    }

    /// Returns the number of identifiers allocated so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next_id - Self::FIRST
    }
}

impl Default for TargetIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_ids() {
        assert!(!TargetId::INVALID.is_valid());
        assert!(TargetId::LOCAL_PLAYER.is_valid());
        assert!(TargetId::LOCAL_PLAYER.is_local_player());
        assert!(!TargetId::from_raw(7).is_local_player());
    }

    #[test]
    fn test_allocator_skips_reserved_ids() {
        let mut alloc = TargetIdAllocator::new();
        let first = alloc.allocate();
        let second = alloc.allocate();
        assert_eq!(first.id(), 2);
        assert_eq!(second.id(), 3);
        assert_eq!(alloc.count(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(SourceId(42).to_string(), "SourceId(42)");
        assert_eq!(TargetId(7).to_string(), "TargetId(7)");
    }
}
