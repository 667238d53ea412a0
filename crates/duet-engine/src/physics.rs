//! Fixed-step platformer physics.
//!
//! [`PhysicsStepSystem`] advances every [`Rigidbody`] by one tick:
//!
//! 1. **Integrate**: gravity and accumulated force into velocity, velocity
//!    into position. `on_ground` is cleared.
//! 2. **Detect**: rebuild the event buffer with
//!    [`detect_collisions`](crate::collision::detect_collisions), so
//!    resolution sees this tick's post-integration overlaps.
//! 3. **Resolve**: push apart every solid contact once, along its shallower
//!    axis, with slop and a per-axis correction percentage. A body standing
//!    on static ground is lifted to `rest_depth` in one go.
//! 4. **Stabilize**: grounded bodies with a tiny downward residual velocity
//!    are snapped to rest.
//!
//! Resolution is positional. Mass is not consulted: static-vs-dynamic moves
//! only the dynamic body, dynamic-vs-dynamic splits the push evenly.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use duet_ecs::entity::EntityId;
use duet_ecs::world::World;

use crate::collision::{detect_collisions, Aabb, CollisionConfig, DetectionStats};
use crate::components::{Collider, Rigidbody, Transform};
use crate::events::CollisionEventBuffer;
use crate::math::Vec2;
use crate::schedule::{TickContext, UpdateSystem};

// ---------------------------------------------------------------------------
// PhysicsConfig
// ---------------------------------------------------------------------------

/// Tuning constants. These change how platforming feels, so every one of
/// them is data rather than an inline literal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Vertical acceleration in units/s². Negative pulls down (`+y` is up).
    pub gravity: f32,
    /// Penetration below this depth is ignored.
    pub slop: f32,
    /// Share of the remaining vertical penetration removed per tick.
    pub vertical_correction_percent: f32,
    /// Penetration left on a dynamic body standing on a static one. Support
    /// contacts are corrected all the way down to this depth, so a resting
    /// body sits inside `slop` instead of sinking a little every tick.
    pub rest_depth: f32,
    /// Share of the remaining horizontal penetration removed per tick.
    pub horizontal_correction_percent: f32,
    /// Multiplier applied to horizontal velocity heading into an obstacle.
    /// `0` would stop dead (and stick to walls); `1` ignores the wall.
    pub horizontal_velocity_damping: f32,
    /// Grounded bodies with `-ground_snap_band < vy < 0` are set to `vy = 0`.
    pub ground_snap_band: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -20.0,
            slop: 0.01,
            vertical_correction_percent: 0.8,
            rest_depth: 0.005,
            horizontal_correction_percent: 0.4,
            horizontal_velocity_damping: 0.5,
            ground_snap_band: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Counters from one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub vertical: usize,
    pub horizontal: usize,
    /// Trigger contacts passed over.
    pub triggers: usize,
    /// Contacts whose entities lost their transform or collider.
    pub stale: usize,
    /// Contacts already separated or within slop.
    pub settled: usize,
}

/// Everything one physics tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub integrated: usize,
    pub detection: DetectionStats,
    pub resolution: ResolveStats,
    pub snapped: usize,
}

// ---------------------------------------------------------------------------
// Integration
// ---------------------------------------------------------------------------

/// Apply gravity and accumulated force, move every body, and clear
/// `on_ground`. Returns the number of bodies integrated.
pub fn integrate(world: &mut World, config: &PhysicsConfig, dt: f32) -> usize {
    let mut count = 0;
    world.view2_mut::<Transform, Rigidbody>(|_, transform, body| {
        if body.use_gravity {
            body.velocity.y += config.gravity * dt;
        }
        let accel = body.force * body.inverse_mass();
        body.velocity += accel * dt;
        body.force = Vec2::ZERO;

        transform.position.x += body.velocity.x * dt;
        transform.position.y += body.velocity.y * dt;
        body.on_ground = false;
        count += 1;
    });
    count
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Axis {
    Vertical,
    Horizontal,
}

/// Push apart every solid contact in `events`.
///
/// Each pair is handled once, through its `entity < other` entry. Pairs are
/// re-measured before being resolved, since an earlier pair in the same pass
/// may already have separated them.
pub fn resolve_contacts(
    world: &mut World,
    events: &CollisionEventBuffer,
    config: &PhysicsConfig,
) -> ResolveStats {
    let mut stats = ResolveStats::default();
    for event in events.unique_pairs() {
        if event.trigger {
            stats.triggers += 1;
            continue;
        }
        match resolve_pair(world, event.entity, event.other, config) {
            PairOutcome::Resolved(Axis::Vertical) => stats.vertical += 1,
            PairOutcome::Resolved(Axis::Horizontal) => stats.horizontal += 1,
            PairOutcome::Stale => stats.stale += 1,
            PairOutcome::Settled => stats.settled += 1,
            PairOutcome::Ignored => {}
        }
    }
    stats
}

enum PairOutcome {
    Resolved(Axis),
    Stale,
    Settled,
    Ignored,
}

fn body_state(world: &World, entity: EntityId) -> Option<(Transform, Collider)> {
    Some((
        *world.try_get::<Transform>(entity)?,
        *world.try_get::<Collider>(entity)?,
    ))
}

fn resolve_pair(
    world: &mut World,
    a: EntityId,
    b: EntityId,
    config: &PhysicsConfig,
) -> PairOutcome {
    let (Some((ta, ca)), Some((tb, cb))) = (body_state(world, a), body_state(world, b)) else {
        return PairOutcome::Stale;
    };
    if ca.is_static && cb.is_static {
        return PairOutcome::Ignored;
    }
    // Colliders can be swapped between detection and resolution.
    if ca.is_trigger || cb.is_trigger {
        return PairOutcome::Ignored;
    }
    let (Some(box_a), Some(box_b)) = (Aabb::of(&ta, &ca), Aabb::of(&tb, &cb)) else {
        return PairOutcome::Ignored;
    };

    let depth = box_a.overlap_depths(&box_b);
    if depth.x <= 0.0 || depth.y <= 0.0 {
        return PairOutcome::Settled;
    }
    let pen_x = depth.x - config.slop;
    let pen_y = depth.y - config.slop;

    let (share_a, share_b) = match (ca.is_static, cb.is_static) {
        (false, true) => (1.0, 0.0),
        (true, false) => (0.0, 1.0),
        _ => (0.5, 0.5),
    };
    let (center_a, center_b) = (box_a.center(), box_b.center());

    // Ties go vertical so a body on a step corner is lifted, not shoved.
    if pen_y <= pen_x {
        if pen_y <= 0.0 {
            return PairOutcome::Settled;
        }
        let a_up = center_a.y >= center_b.y;
        // Static support underneath: lift fully, leaving `rest_depth`.
        let supported = (a_up && cb.is_static) || (!a_up && ca.is_static);
        let correction = if supported {
            (depth.y - config.rest_depth).max(pen_y)
        } else {
            pen_y * config.vertical_correction_percent
        };
        let dir_a = if a_up { 1.0 } else { -1.0 };
        push_vertical(world, a, dir_a * correction * share_a, a_up);
        push_vertical(world, b, -dir_a * correction * share_b, !a_up);
        trace!(%a, %b, depth = pen_y, correction, "resolved vertical");
        PairOutcome::Resolved(Axis::Vertical)
    } else {
        if pen_x <= 0.0 {
            return PairOutcome::Settled;
        }
        let correction = pen_x * config.horizontal_correction_percent;
        let dir_a = if center_a.x >= center_b.x { 1.0 } else { -1.0 };
        push_horizontal(world, a, dir_a * correction * share_a, config);
        push_horizontal(world, b, -dir_a * correction * share_b, config);
        trace!(%a, %b, depth = pen_x, correction, "resolved horizontal");
        PairOutcome::Resolved(Axis::Horizontal)
    }
}

/// Move `entity` by `dy`. Velocity heading back into the obstacle is zeroed;
/// a body pushed upward is grounded.
fn push_vertical(world: &mut World, entity: EntityId, dy: f32, pushed_up: bool) {
    if dy == 0.0 {
        return;
    }
    if let Some(transform) = world.try_get_mut::<Transform>(entity) {
        transform.position.y += dy;
    }
    if let Some(body) = world.try_get_mut::<Rigidbody>(entity) {
        if body.velocity.y * dy < 0.0 {
            body.velocity.y = 0.0;
        }
        if pushed_up {
            body.on_ground = true;
        }
    }
}

/// Move `entity` by `dx`. Velocity heading back into the obstacle is damped,
/// not zeroed.
fn push_horizontal(world: &mut World, entity: EntityId, dx: f32, config: &PhysicsConfig) {
    if dx == 0.0 {
        return;
    }
    if let Some(transform) = world.try_get_mut::<Transform>(entity) {
        transform.position.x += dx;
    }
    if let Some(body) = world.try_get_mut::<Rigidbody>(entity) {
        if body.velocity.x * dx < 0.0 {
            body.velocity.x *= config.horizontal_velocity_damping;
        }
    }
}

// ---------------------------------------------------------------------------
// Stabilization
// ---------------------------------------------------------------------------

/// Zero the small downward drift of grounded bodies. Returns how many were
/// snapped.
pub fn stabilize(world: &mut World, config: &PhysicsConfig) -> usize {
    let mut snapped = 0;
    world.view1_mut::<Rigidbody>(|_, body| {
        let vy = body.velocity.y;
        if body.on_ground && vy < 0.0 && vy > -config.ground_snap_band {
            body.velocity.y = 0.0;
            snapped += 1;
        }
    });
    snapped
}

// ---------------------------------------------------------------------------
// Full step
// ---------------------------------------------------------------------------

/// Integrate, detect, resolve, stabilize.
pub fn step(
    world: &mut World,
    events: &mut CollisionEventBuffer,
    physics: &PhysicsConfig,
    collision: &CollisionConfig,
    dt: f32,
) -> StepReport {
    let integrated = integrate(world, physics, dt);
    let detection = detect_collisions(world, collision, events);
    let resolution = resolve_contacts(world, events, physics);
    let snapped = stabilize(world, physics);
    StepReport {
        integrated,
        detection,
        resolution,
        snapped,
    }
}

/// The physics update system.
#[derive(Debug, Default)]
pub struct PhysicsStepSystem {
    pub config: PhysicsConfig,
    pub collision: CollisionConfig,
    last_report: StepReport,
}

impl PhysicsStepSystem {
    pub fn new(config: PhysicsConfig, collision: CollisionConfig) -> Self {
        Self {
            config,
            collision,
            last_report: StepReport::default(),
        }
    }

    /// What the most recent tick did.
    pub fn last_report(&self) -> StepReport {
        self.last_report
    }
}

impl UpdateSystem for PhysicsStepSystem {
    fn update(&mut self, ctx: &mut TickContext<'_>) {
        self.last_report = step(ctx.world, ctx.events, &self.config, &self.collision, ctx.dt);
        let r = &self.last_report;
        debug!(
            tick = ctx.tick,
            bodies = r.integrated,
            contacts = r.detection.contacts,
            vertical = r.resolution.vertical,
            horizontal = r.resolution.horizontal,
            snapped = r.snapped,
            "physics step"
        );
    }

    fn name(&self) -> &str {
        "physics_step"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
