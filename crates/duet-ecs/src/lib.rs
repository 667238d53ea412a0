//! Duet ECS -- a small sparse-set Entity Component System.
//!
//! Entities are bare ids. Each component type gets its own dense storage,
//! created lazily on first use and kept for the world's lifetime. Views walk
//! one storage and look up the others, so adding a new component type never
//! touches existing code.
//!
//! # Quick Start
//!
//! ```
//! use duet_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut world = World::new();
//! let e = world.create();
//! world.add(e, Position { x: 0.0, y: 0.0 });
//! world.add(e, Velocity { dx: 1.0, dy: 0.5 });
//!
//! world.view2_mut::<Position, Velocity>(|_, pos, vel| {
//!     pos.x += vel.dx;
//!     pos.y += vel.dy;
//! });
//!
//! assert_eq!(world.get::<Position>(e), &Position { x: 1.0, y: 0.5 });
//! ```

#![deny(unsafe_code)]

pub mod command;
pub mod component;
pub mod entity;
pub mod query;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by deferred ECS operations.
///
/// Direct world access never returns these: missing components are either a
/// `None` (`try_get`) or a panic (`get`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (destroyed or never created).
    #[error("entity {entity} does not exist (destroyed or never created)")]
    StaleEntity { entity: entity::EntityId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common types.
pub mod prelude {
    pub use crate::command::{ApplyReport, CommandBuffer};
    pub use crate::component::{Component, ComponentStorage};
    pub use crate::entity::EntityId;
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
