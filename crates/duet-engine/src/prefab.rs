//! Spawn helpers for common stage pieces.
//!
//! Each helper is plain `World::add` calls with a preset layer setup:
//!
//! | piece      | layer        | hit mask                 | flags             |
//! |------------|--------------|--------------------------|-------------------|
//! | player     | `PLAYER`     | `SOLID \| PLAYER`        | dynamic           |
//! | platform   | `GROUND`     | `NONE`                   | static            |
//! | wall       | `WALL`       | `NONE`                   | static            |
//! | goal       | `GOAL`       | `PLAYER`                 | static, trigger   |
//! | death zone | `HAZARD`     | `PLAYER \| PROP`         | static, trigger   |
//! | decoration | `DECORATION` | `NONE`                   | static            |
//!
//! Static pieces ask about nothing; the OR mask rule lets movers find them.

use duet_ecs::entity::EntityId;
use duet_ecs::world::World;

use crate::components::{
    layers, Collider, DeathZone, Follower, Goal, Player, Rigidbody, SpawnPoint, Transform,
};
use crate::math::Vec2;

/// Player body half extents.
pub const PLAYER_HALF_EXTENTS: Vec2 = Vec2 { x: 0.4, y: 0.9 };

/// A player body standing at `spawn`, which is also its respawn point.
pub fn spawn_player(world: &mut World, index: u8, spawn: Vec2) -> EntityId {
    let e = world.create();
    world.add(e, Transform::at(spawn.x, spawn.y));
    world.add(
        e,
        Collider::aabb(PLAYER_HALF_EXTENTS.x, PLAYER_HALF_EXTENTS.y)
            .with_layers(layers::PLAYER, layers::SOLID | layers::PLAYER),
    );
    world.add_default::<Rigidbody>(e);
    world.add(e, Player { index });
    world.add(e, SpawnPoint { position: spawn });
    e
}

/// Static ground centered at `center`.
pub fn spawn_platform(world: &mut World, center: Vec2, half_extents: Vec2) -> EntityId {
    spawn_static(world, center, half_extents, layers::GROUND)
}

/// Static wall centered at `center`.
pub fn spawn_wall(world: &mut World, center: Vec2, half_extents: Vec2) -> EntityId {
    spawn_static(world, center, half_extents, layers::WALL)
}

fn spawn_static(world: &mut World, center: Vec2, half_extents: Vec2, layer: u32) -> EntityId {
    let e = world.create();
    world.add(e, Transform::at(center.x, center.y));
    world.add(
        e,
        Collider::aabb(half_extents.x, half_extents.y)
            .with_layers(layer, layers::NONE)
            .fixed(),
    );
    e
}

/// A push-around box that lands on ground and other props.
pub fn spawn_crate(world: &mut World, center: Vec2, half_extent: f32) -> EntityId {
    let e = world.create();
    world.add(e, Transform::at(center.x, center.y));
    world.add(
        e,
        Collider::aabb(half_extent, half_extent)
            .with_layers(layers::PROP, layers::SOLID | layers::PLAYER),
    );
    world.add_default::<Rigidbody>(e);
    e
}

/// Stage exit trigger.
pub fn spawn_goal(world: &mut World, center: Vec2, half_extents: Vec2) -> EntityId {
    let e = world.create();
    world.add(e, Transform::at(center.x, center.y));
    world.add(
        e,
        Collider::aabb(half_extents.x, half_extents.y)
            .with_layers(layers::GOAL, layers::PLAYER)
            .trigger()
            .fixed(),
    );
    world.add(e, Goal);
    e
}

/// Kill volume. Players respawn, props are destroyed.
pub fn spawn_death_zone(world: &mut World, center: Vec2, half_extents: Vec2) -> EntityId {
    let e = world.create();
    world.add(e, Transform::at(center.x, center.y));
    world.add(
        e,
        Collider::aabb(half_extents.x, half_extents.y)
            .with_layers(layers::HAZARD, layers::PLAYER | layers::PROP)
            .trigger()
            .fixed(),
    );
    world.add(e, DeathZone);
    e
}

/// Scenery with a collider that nothing ever asks about. Stages carry many
/// of these; the broad phase skips the distant ones.
pub fn spawn_decoration(world: &mut World, position: Vec2, half_extents: Vec2) -> EntityId {
    spawn_static(world, position, half_extents, layers::DECORATION)
}

/// An entity that tracks `target` at `offset`, e.g. a name tag.
pub fn spawn_follower(world: &mut World, target: EntityId, offset: Vec2) -> EntityId {
    let e = world.create();
    let start = world
        .try_get::<Transform>(target)
        .map_or(Vec2::ZERO, |t| t.position.xy())
        + offset;
    world.add(e, Transform::at(start.x, start.y));
    world.add(e, Follower { target, offset });
    e
}
