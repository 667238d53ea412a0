//! Duet Engine -- 2D platformer simulation core for two-player stages.
//!
//! Builds on [`duet_ecs`] with the pieces a stage needs every tick: AABB
//! contact detection with a player-centered broad phase, positional physics
//! tuned for platforming, an ordered update/render system registry, and a
//! fixed-timestep [`Simulation`](simulation::Simulation) driver.
//!
//! # Quick Start
//!
//! ```
//! use duet_engine::prelude::*;
//!
//! let mut sim = Simulation::platformer(World::new(), &EngineConfig::default());
//! let world = sim.world_mut();
//! spawn_platform(world, Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.5));
//! let p1 = spawn_player(world, 0, Vec2::new(-2.0, 1.5));
//! spawn_player(world, 1, Vec2::new(2.0, 1.5));
//!
//! sim.run_ticks(120);
//! assert!(sim.world().get::<Rigidbody>(p1).on_ground);
//! ```

#![deny(unsafe_code)]

pub mod collision;
pub mod components;
pub mod config;
pub mod events;
pub mod gameplay;
pub mod math;
pub mod physics;
pub mod prefab;
pub mod schedule;
pub mod simulation;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use duet_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use duet_ecs::prelude::*;

    pub use crate::collision::{detect_collisions, Aabb, Collision2DSystem, CollisionConfig};
    pub use crate::components::{
        layers, Collider, ColliderShape, DeathZone, Follower, Goal, Player, Rigidbody,
        SpawnPoint, Transform,
    };
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::events::{CollisionEvent, CollisionEventBuffer};
    pub use crate::gameplay::{DeathZoneSystem, FollowSystem, GoalSystem, StageProgress};
    pub use crate::math::{Vec2, Vec3};
    pub use crate::physics::{PhysicsConfig, PhysicsStepSystem};
    pub use crate::prefab::{
        spawn_crate, spawn_death_zone, spawn_decoration, spawn_follower, spawn_goal,
        spawn_platform, spawn_player, spawn_wall,
    };
    pub use crate::schedule::{RenderSystem, SystemRegistry, TickContext, UpdateSystem};
    pub use crate::simulation::{Simulation, TickConfig, TickDiagnostics};
}
