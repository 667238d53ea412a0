//! Per-tick contact events.
//!
//! Detection clears the [`CollisionEventBuffer`] and refills it once per tick.
//! Every overlapping pair is recorded in both directions, so a consumer can
//! ask "what did *I* touch" by filtering on [`CollisionEvent::entity`] alone.

use serde::{Deserialize, Serialize};

use duet_ecs::entity::EntityId;

/// One side of a contact between two colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// The entity this record is about.
    pub entity: EntityId,
    /// The entity it touched.
    pub other: EntityId,
    /// Either collider was a trigger. Trigger contacts are never resolved.
    pub trigger: bool,
}

/// Flat, insertion-ordered list of this tick's contacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollisionEventBuffer {
    events: Vec<CollisionEvent>,
}

impl CollisionEventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every recorded event. Capacity is kept for the next tick.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Record a contact between `a` and `b` as two entries, `a -> b` then
    /// `b -> a`.
    pub fn push_pair(&mut self, a: EntityId, b: EntityId, trigger: bool) {
        self.events.push(CollisionEvent {
            entity: a,
            other: b,
            trigger,
        });
        self.events.push(CollisionEvent {
            entity: b,
            other: a,
            trigger,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn as_slice(&self) -> &[CollisionEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CollisionEvent> {
        self.events.iter()
    }

    /// Contacts recorded from `entity`'s point of view.
    pub fn touching(&self, entity: EntityId) -> impl Iterator<Item = &CollisionEvent> + '_ {
        self.events.iter().filter(move |e| e.entity == entity)
    }

    /// Whether `a` touched `b` this tick.
    pub fn contains_pair(&self, a: EntityId, b: EntityId) -> bool {
        self.events.iter().any(|e| e.entity == a && e.other == b)
    }

    /// Each contact once, as the `entity < other` half of its two entries.
    pub fn unique_pairs(&self) -> impl Iterator<Item = &CollisionEvent> + '_ {
        self.events.iter().filter(|e| e.entity < e.other)
    }
}

impl<'a> IntoIterator for &'a CollisionEventBuffer {
    type Item = &'a CollisionEvent;
    type IntoIter = std::slice::Iter<'a, CollisionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
