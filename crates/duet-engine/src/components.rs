//! Component types understood by the simulation.
//!
//! Everything here is plain data. The collision and physics systems read
//! [`Transform`], [`Collider`] and [`Rigidbody`]; the gameplay systems add a
//! few tags and small records on top. None of them carry behaviour.

use serde::{Deserialize, Serialize};

use duet_ecs::entity::EntityId;

use crate::math::{Vec2, Vec3};

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// World-space placement of an entity.
///
/// Collision only reads `position.x` / `position.y`. Rotation (degrees) and
/// scale are carried for rendering and are ignored by collider math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    /// A transform at `(x, y, 0)` with no rotation and unit scale.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec3::new(x, y, 0.0),
            ..Self::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

// ---------------------------------------------------------------------------
// Collision layers
// ---------------------------------------------------------------------------

/// Collision layer bits.
///
/// A collider's `layer` says what it *is*; its `hit_mask` says what it tests
/// against. A pair is considered when either side's mask hits the other's
/// layer (see [`Collider::masks_overlap`]).
pub mod layers {
    pub const NONE: u32 = 0;
    pub const ALL: u32 = u32::MAX;

    pub const PLAYER: u32 = 1 << 0;
    pub const GROUND: u32 = 1 << 1;
    pub const WALL: u32 = 1 << 2;
    pub const GOAL: u32 = 1 << 3;
    pub const HAZARD: u32 = 1 << 4;
    pub const PROP: u32 = 1 << 5;
    pub const DECORATION: u32 = 1 << 6;

    /// Everything a player body normally stands on or bumps into.
    pub const SOLID: u32 = GROUND | WALL | PROP;
}

// ---------------------------------------------------------------------------
// Collider
// ---------------------------------------------------------------------------

/// Collision geometry.
///
/// Only [`ColliderShape::Aabb2D`] has working overlap math. The other shapes
/// can be stored and round-tripped, but any pair involving them never
/// collides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ColliderShape {
    /// Axis-aligned box given by half extents.
    #[serde(rename = "aabb")]
    Aabb2D { half_width: f32, half_height: f32 },
    #[serde(rename = "circle")]
    Circle2D { radius: f32 },
    #[serde(rename = "capsule")]
    Capsule2D { radius: f32, half_height: f32 },
}

impl ColliderShape {
    /// Half extents when this is a usable box: an AABB with strictly positive,
    /// finite extents. Anything else yields `None`.
    pub fn aabb_half_extents(&self) -> Option<Vec2> {
        match *self {
            ColliderShape::Aabb2D {
                half_width,
                half_height,
            } if half_width > 0.0
                && half_height > 0.0
                && half_width.is_finite()
                && half_height.is_finite() =>
            {
                Some(Vec2::new(half_width, half_height))
            }
            _ => None,
        }
    }
}

/// A collision volume attached to an entity's [`Transform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: ColliderShape,
    /// What this collider is.
    pub layer: u32,
    /// Which layers this collider tests against.
    pub hit_mask: u32,
    /// Local offset from the transform position (x/y only).
    #[serde(default)]
    pub offset: Vec2,
    /// Contacts are reported but never resolved.
    #[serde(default)]
    pub is_trigger: bool,
    /// Never moved by resolution.
    #[serde(default)]
    pub is_static: bool,
    /// Surface friction. Stored for game code; the resolver does not read it.
    #[serde(default)]
    pub friction: f32,
}

impl Collider {
    /// A solid, dynamic box on every layer, testing every layer.
    pub fn aabb(half_width: f32, half_height: f32) -> Self {
        Self {
            shape: ColliderShape::Aabb2D {
                half_width,
                half_height,
            },
            layer: layers::ALL,
            hit_mask: layers::ALL,
            offset: Vec2::ZERO,
            is_trigger: false,
            is_static: false,
            friction: 0.0,
        }
    }

    pub fn with_layers(mut self, layer: u32, hit_mask: u32) -> Self {
        self.layer = layer;
        self.hit_mask = hit_mask;
        self
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset = Vec2::new(x, y);
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Layer test for a candidate pair: either side's mask hits the other's
    /// layer. Deliberately OR, so a sensor that only lists the player layer
    /// still reports the player even if the player's mask ignores sensors.
    #[inline]
    pub fn masks_overlap(&self, other: &Collider) -> bool {
        (self.hit_mask & other.layer) != 0 || (other.hit_mask & self.layer) != 0
    }

    /// Collider center for an entity positioned at `position`.
    #[inline]
    pub fn center(&self, position: Vec3) -> Vec2 {
        position.xy() + self.offset
    }
}

// ---------------------------------------------------------------------------
// Rigidbody
// ---------------------------------------------------------------------------

/// Integration state for a moving body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rigidbody {
    pub velocity: Vec2,
    /// Force accumulated since the last step. Applied then cleared.
    pub force: Vec2,
    /// Scales accumulated force only. Values `<= 0` count as `1`.
    pub mass: f32,
    pub use_gravity: bool,
    /// Set by resolution when the body was pushed up out of something this
    /// tick. Reset at the start of every integration step.
    pub on_ground: bool,
}

impl Rigidbody {
    /// Accumulate a force to be applied on the next step.
    pub fn add_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Effective inverse mass for force integration.
    pub fn inverse_mass(&self) -> f32 {
        if self.mass > 0.0 && self.mass.is_finite() {
            1.0 / self.mass
        } else {
            1.0
        }
    }
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
            mass: 1.0,
            use_gravity: true,
            on_ground: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tags and gameplay records
// ---------------------------------------------------------------------------

/// Marks a player-controlled body. `index` is 0 or 1 in a two-player stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Player {
    pub index: u8,
}

/// Stage exit. Touching it counts the player as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Goal;

/// Touching this sends players back to their spawn point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathZone;

/// Where a player respawns.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub position: Vec2,
}

/// Keeps an entity glued to another one (name tags, held items, markers).
///
/// `target` is a weak reference: it may point at an entity that has since
/// been destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Follower {
    pub target: EntityId,
    pub offset: Vec2,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
