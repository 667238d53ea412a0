//! 2D contact detection.
//!
//! [`detect_collisions`] is the only detection routine in the engine. Each
//! call rebuilds the [`CollisionEventBuffer`] from the current
//! [`Transform`] + [`Collider`] state:
//!
//! 1. Collect every collider with its effective center
//!    (`position.xy + offset`) and whether it belongs to a [`Player`].
//! 2. Broad phase: when at least one player exists, a pair with no player in
//!    it is only tested if one of its members lies within
//!    [`CollisionConfig::prune_radius`] of some player. With no players
//!    nothing is pruned.
//! 3. Narrow phase on every surviving pair `(i, j)`, `i < j`: layer masks
//!    (asymmetric OR), both shapes must be usable AABBs, and the boxes must
//!    overlap strictly on both axes. Touching edges do not count.
//! 4. Record the contact twice (`a -> b`, `b -> a`), flagged as a trigger if
//!    either collider is one.
//!
//! Detection never moves anything. Resolution lives in
//! [`physics`](crate::physics).

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use duet_ecs::entity::EntityId;
use duet_ecs::world::World;

use crate::components::{Collider, Player, Transform};
use crate::events::CollisionEventBuffer;
use crate::math::Vec2;
use crate::schedule::{TickContext, UpdateSystem};

// ---------------------------------------------------------------------------
// CollisionConfig
// ---------------------------------------------------------------------------

/// Tuning for the detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Non-player pairs farther than this from every player are skipped.
    pub prune_radius: f32,
}

impl CollisionConfig {
    pub const DEFAULT_PRUNE_RADIUS: f32 = 500.0;
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            prune_radius: Self::DEFAULT_PRUNE_RADIUS,
        }
    }
}

// ---------------------------------------------------------------------------
// Aabb
// ---------------------------------------------------------------------------

/// An axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// World box for `collider` on an entity at `transform`, if the collider
    /// is a usable AABB.
    pub fn of(transform: &Transform, collider: &Collider) -> Option<Self> {
        let half = collider.shape.aabb_half_extents()?;
        Some(Self::from_center(collider.center(transform.position), half))
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Strict overlap on both axes. Shared edges are not an overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Penetration depth along each axis. Non-positive on an axis means the
    /// boxes are apart (or just touching) along it.
    #[inline]
    pub fn overlap_depths(&self, other: &Aabb) -> Vec2 {
        Vec2::new(
            self.max.x.min(other.max.x) - self.min.x.max(other.min.x),
            self.max.y.min(other.max.y) - self.min.y.max(other.min.y),
        )
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Counters from one detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionStats {
    /// Entities with both a transform and a collider.
    pub colliders: usize,
    /// Pairs skipped by the broad phase.
    pub pruned: usize,
    /// Pairs that reached the narrow phase.
    pub tested: usize,
    /// Pairs recorded (each one produces two events).
    pub contacts: usize,
}

struct Candidate {
    entity: EntityId,
    center: Vec2,
    collider: Collider,
    is_player: bool,
}

/// Rebuild `events` from the world's current colliders.
pub fn detect_collisions(
    world: &World,
    config: &CollisionConfig,
    events: &mut CollisionEventBuffer,
) -> DetectionStats {
    events.clear();

    let mut candidates: Vec<Candidate> = Vec::new();
    world.view2::<Transform, Collider>(|entity, transform, collider| {
        candidates.push(Candidate {
            entity,
            center: collider.center(transform.position),
            collider: *collider,
            is_player: world.has::<Player>(entity),
        });
    });

    let mut stats = DetectionStats {
        colliders: candidates.len(),
        ..DetectionStats::default()
    };
    if candidates.is_empty() {
        return stats;
    }

    let near_player = broad_phase(&candidates, config.prune_radius);

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            if let Some(near) = &near_player {
                if !near[i] && !near[j] {
                    stats.pruned += 1;
                    continue;
                }
            }
            stats.tested += 1;

            let (a, b) = (&candidates[i], &candidates[j]);
            if !a.collider.masks_overlap(&b.collider) {
                continue;
            }
            let (Some(half_a), Some(half_b)) = (
                a.collider.shape.aabb_half_extents(),
                b.collider.shape.aabb_half_extents(),
            ) else {
                continue;
            };
            let box_a = Aabb::from_center(a.center, half_a);
            let box_b = Aabb::from_center(b.center, half_b);
            if !box_a.overlaps(&box_b) {
                continue;
            }

            let trigger = a.collider.is_trigger || b.collider.is_trigger;
            trace!(a = %a.entity, b = %b.entity, trigger, "contact");
            events.push_pair(a.entity, b.entity, trigger);
            stats.contacts += 1;
        }
    }

    debug!(
        colliders = stats.colliders,
        pruned = stats.pruned,
        tested = stats.tested,
        contacts = stats.contacts,
        "collision pass"
    );
    stats
}

/// Per-candidate "counts as near a player" flags, or `None` when there are
/// no players and nothing may be pruned.
fn broad_phase(candidates: &[Candidate], radius: f32) -> Option<Vec<bool>> {
    let players: Vec<Vec2> = candidates
        .iter()
        .filter(|c| c.is_player)
        .map(|c| c.center)
        .collect();
    if players.is_empty() {
        return None;
    }
    let radius_sq = radius * radius;
    Some(
        candidates
            .iter()
            .map(|c| {
                c.is_player
                    || players
                        .iter()
                        .any(|&p| c.center.distance_squared(p) <= radius_sq)
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Collision2DSystem
// ---------------------------------------------------------------------------

/// Detection as a standalone update system.
///
/// Scenes with physics do not need this: [`PhysicsStepSystem`] runs the same
/// detection between integration and resolution. Menu and title scenes that
/// only want trigger contacts register this one instead.
///
/// [`PhysicsStepSystem`]: crate::physics::PhysicsStepSystem
#[derive(Debug, Default)]
pub struct Collision2DSystem {
    pub config: CollisionConfig,
    last_stats: DetectionStats,
}

impl Collision2DSystem {
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            config,
            last_stats: DetectionStats::default(),
        }
    }

    /// Counters from the most recent pass.
    pub fn last_stats(&self) -> DetectionStats {
        self.last_stats
    }
}

impl UpdateSystem for Collision2DSystem {
    fn update(&mut self, ctx: &mut TickContext<'_>) {
        self.last_stats = detect_collisions(ctx.world, &self.config, ctx.events);
    }

    fn name(&self) -> &str {
        "collision_2d"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{layers, ColliderShape};

    fn spawn(world: &mut World, x: f32, y: f32, collider: Collider) -> EntityId {
        let e = world.create();
        world.add(e, Transform::at(x, y));
        world.add(e, collider);
        e
    }

    fn detect(world: &World) -> CollisionEventBuffer {
        let mut events = CollisionEventBuffer::new();
        detect_collisions(world, &CollisionConfig::default(), &mut events);
        events
    }

    #[test]
    fn overlapping_boxes_produce_symmetric_events() {
        let mut world = World::new();
        let a = spawn(&mut world, 0.0, 0.0, Collider::aabb(1.0, 1.0));
        let b = spawn(&mut world, 1.5, 0.5, Collider::aabb(1.0, 1.0));

        let events = detect(&world);
        assert_eq!(events.len(), 2);
        assert!(events.contains_pair(a, b));
        assert!(events.contains_pair(b, a));
        assert!(events.iter().all(|e| !e.trigger));
    }

    #[test]
    fn touching_edges_do_not_collide() {
        let mut world = World::new();
        spawn(&mut world, 0.0, 0.0, Collider::aabb(1.0, 1.0));
        spawn(&mut world, 2.0, 0.0, Collider::aabb(1.0, 1.0));
        assert!(detect(&world).is_empty());
    }

    #[test]
    fn trigger_on_either_side_marks_the_contact() {
        let mut world = World::new();
        spawn(&mut world, 0.0, 0.0, Collider::aabb(1.0, 1.0));
        spawn(&mut world, 0.5, 0.0, Collider::aabb(1.0, 1.0).trigger());
        let events = detect(&world);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.trigger));
    }

    #[test]
    fn mask_test_accepts_one_sided_interest() {
        let mut world = World::new();
        // a ignores b's layer, but b tests a's layer.
        let a = spawn(
            &mut world,
            0.0,
            0.0,
            Collider::aabb(1.0, 1.0).with_layers(layers::PLAYER, layers::GROUND),
        );
        let b = spawn(
            &mut world,
            0.5,
            0.0,
            Collider::aabb(1.0, 1.0).with_layers(layers::GOAL, layers::PLAYER),
        );
        let events = detect(&world);
        assert!(events.contains_pair(a, b));

        // Neither side interested: no contact.
        world.add(b, Collider::aabb(1.0, 1.0).with_layers(layers::GOAL, layers::HAZARD));
        assert!(detect(&world).is_empty());
    }

    #[test]
    fn offsets_shift_the_box() {
        let mut world = World::new();
        spawn(&mut world, 0.0, 0.0, Collider::aabb(1.0, 1.0));
        // Transforms 5 apart, offset brings the box back into contact.
        spawn(&mut world, 5.0, 0.0, Collider::aabb(1.0, 1.0).with_offset(-4.0, 0.0));
        assert_eq!(detect(&world).len(), 2);
    }

    #[test]
    fn unsupported_and_degenerate_shapes_never_collide() {
        let mut world = World::new();
        spawn(&mut world, 0.0, 0.0, Collider::aabb(1.0, 1.0));
        let mut circle = Collider::aabb(1.0, 1.0);
        circle.shape = ColliderShape::Circle2D { radius: 2.0 };
        spawn(&mut world, 0.0, 0.0, circle);
        spawn(&mut world, 0.0, 0.0, Collider::aabb(0.0, 1.0));
        spawn(&mut world, 0.0, 0.0, Collider::aabb(1.0, -2.0));
        assert!(detect(&world).is_empty());
    }

    #[test]
    fn colliders_without_transforms_are_ignored() {
        let mut world = World::new();
        spawn(&mut world, 0.0, 0.0, Collider::aabb(1.0, 1.0));
        let loose = world.create();
        world.add(loose, Collider::aabb(1.0, 1.0));
        assert!(detect(&world).is_empty());
    }

    #[test]
    fn empty_world_clears_stale_events() {
        let world = World::new();
        let mut events = CollisionEventBuffer::new();
        events.push_pair(EntityId::from_raw(1), EntityId::from_raw(2), false);
        let stats = detect_collisions(&world, &CollisionConfig::default(), &mut events);
        assert!(events.is_empty());
        assert_eq!(stats, DetectionStats::default());
    }

    #[test]
    fn far_non_player_pairs_are_pruned_but_player_pairs_are_not() {
        let mut world = World::new();
        let player = spawn(&mut world, 0.0, 0.0, Collider::aabb(0.5, 0.5));
        world.add(player, Player { index: 0 });
        // Two overlapping props far from the player.
        let p1 = spawn(&mut world, 2000.0, 0.0, Collider::aabb(1.0, 1.0));
        let p2 = spawn(&mut world, 2000.5, 0.0, Collider::aabb(1.0, 1.0));

        let mut events = CollisionEventBuffer::new();
        let stats = detect_collisions(&world, &CollisionConfig::default(), &mut events);
        assert!(!events.contains_pair(p1, p2));
        assert_eq!(stats.pruned, 1);
        // Player pairs are always tested.
        assert_eq!(stats.tested, 2);

        // A huge player box reaches the far props and is never pruned.
        world.add(player, Collider::aabb(5000.0, 5000.0));
        let events = detect(&world);
        assert!(events.contains_pair(player, p1));
        assert!(events.contains_pair(player, p2));
        assert!(!events.contains_pair(p1, p2));
    }

    #[test]
    fn pair_near_a_player_is_kept() {
        let mut world = World::new();
        let player = spawn(&mut world, 0.0, 0.0, Collider::aabb(0.5, 0.5));
        world.add(player, Player { index: 1 });
        // One member inside the radius is enough.
        let near = spawn(&mut world, 499.0, 0.0, Collider::aabb(1.0, 1.0));
        let far = spawn(&mut world, 500.5, 0.0, Collider::aabb(1.0, 1.0));
        assert!(detect(&world).contains_pair(near, far));
    }

    #[test]
    fn nothing_is_pruned_without_players() {
        let mut world = World::new();
        let a = spawn(&mut world, 10_000.0, 0.0, Collider::aabb(1.0, 1.0));
        let b = spawn(&mut world, 10_001.0, 0.0, Collider::aabb(1.0, 1.0));
        let mut events = CollisionEventBuffer::new();
        let stats = detect_collisions(&world, &CollisionConfig::default(), &mut events);
        assert!(events.contains_pair(a, b));
        assert_eq!(stats.pruned, 0);
    }

    #[test]
    fn aabb_depths() {
        let a = Aabb::from_center(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
        let b = Aabb::from_center(Vec2::new(1.5, 0.5), Vec2::new(1.0, 1.0));
        assert!(a.overlaps(&b));
        assert_eq!(a.overlap_depths(&b), Vec2::new(0.5, 1.5));
        assert_eq!(a.center(), Vec2::ZERO);
    }

    #[test]
    fn system_wrapper_records_stats() {
        let mut world = World::new();
        spawn(&mut world, 0.0, 0.0, Collider::aabb(1.0, 1.0));
        spawn(&mut world, 0.5, 0.0, Collider::aabb(1.0, 1.0));
        let mut events = CollisionEventBuffer::new();
        let mut commands = duet_ecs::command::CommandBuffer::new();
        let mut system = Collision2DSystem::default();
        system.update(&mut TickContext {
            world: &mut world,
            events: &mut events,
            commands: &mut commands,
            dt: 1.0 / 60.0,
            tick: 0,
        });
        assert_eq!(system.last_stats().contacts, 1);
        assert_eq!(events.len(), 2);
    }
}
