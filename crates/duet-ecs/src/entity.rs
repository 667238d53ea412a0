//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is an opaque, monotonically increasing 64-bit handle. Ids
//! are never recycled within a [`World`](crate::world::World)'s lifetime, so a
//! stale id can never alias a newer entity. The raw value `0` is reserved as
//! [`EntityId::NONE`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// An opaque entity identifier.
///
/// Ordering follows issue order, which the collision pipeline relies on to
/// visit each unordered pair once (`self < other`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// The reserved "no entity" id. Never returned by [`EntityAllocator::allocate`].
    pub const NONE: EntityId = EntityId(0);

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Whether this is the reserved [`EntityId::NONE`].
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Issues fresh [`EntityId`]s and tracks which ones are still alive.
///
/// Ids grow without bound for the lifetime of the allocator. That is fine for
/// a single play session and removes any chance of a recycled id resurrecting
/// a dangling reference.
#[derive(Debug)]
pub struct EntityAllocator {
    /// Raw value of the next id to hand out. Starts at 1.
    next: u64,
    /// Ids that have been allocated and not yet deallocated.
    alive: HashSet<EntityId>,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self {
            next: 1,
            alive: HashSet::new(),
        }
    }

    /// Allocate a never-before-issued, non-zero [`EntityId`].
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        self.alive.insert(id);
        id
    }

    /// Mark an entity as dead.
    ///
    /// Returns `true` if the entity was alive, `false` if it was already dead
    /// or was never issued by this allocator.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        self.alive.remove(&id)
    }

    /// Returns `true` if `id` was issued by this allocator and not yet deallocated.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    /// Total number of currently alive entities.
    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    /// Total number of ids ever issued.
    pub fn issued_count(&self) -> u64 {
        self.next - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
