//! Stage rules built on top of the contact buffer.
//!
//! These systems run after [`PhysicsStepSystem`](crate::physics::PhysicsStepSystem)
//! in the same tick, so they see the contacts it just detected. They read
//! events; they never run detection themselves.

use tracing::{debug, info, warn};

use duet_ecs::entity::EntityId;

use crate::components::{DeathZone, Follower, Goal, Player, Rigidbody, SpawnPoint, Transform};
use crate::math::Vec2;
use crate::schedule::{TickContext, UpdateSystem};

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

/// Which players have reached an exit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageProgress {
    reached: Vec<EntityId>,
    waiting: usize,
}

impl StageProgress {
    /// Players that have touched a goal, in arrival order.
    pub fn reached(&self) -> &[EntityId] {
        &self.reached
    }

    pub fn has_reached(&self, player: EntityId) -> bool {
        self.reached.contains(&player)
    }

    /// Every live player has reached a goal, and there is at least one.
    pub fn cleared(&self) -> bool {
        !self.reached.is_empty() && self.waiting == 0
    }

    pub fn reset(&mut self) {
        self.reached.clear();
        self.waiting = 0;
    }
}

/// Records players touching a [`Goal`].
#[derive(Debug, Default)]
pub struct GoalSystem {
    progress: StageProgress,
}

impl GoalSystem {
    pub fn progress(&self) -> &StageProgress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut StageProgress {
        &mut self.progress
    }
}

impl UpdateSystem for GoalSystem {
    fn update(&mut self, ctx: &mut TickContext<'_>) {
        let world = &*ctx.world;
        let was_cleared = self.progress.cleared();

        for event in ctx.events.iter() {
            if !world.has::<Player>(event.entity) || !world.has::<Goal>(event.other) {
                continue;
            }
            if !self.progress.has_reached(event.entity) {
                debug!(player = %event.entity, goal = %event.other, "player reached goal");
                self.progress.reached.push(event.entity);
            }
        }

        // Destroyed players neither count as finished nor as waiting.
        self.progress.reached.retain(|&p| world.has::<Player>(p));
        let players = world.entities_with::<Player>();
        self.progress.waiting = players
            .iter()
            .filter(|&p| !self.progress.reached.contains(p))
            .count();

        if self.progress.cleared() && !was_cleared {
            info!(tick = ctx.tick, players = players.len(), "stage cleared");
        }
    }

    fn name(&self) -> &str {
        "goals"
    }
}

// ---------------------------------------------------------------------------
// Death zones
// ---------------------------------------------------------------------------

/// Sends players touching a [`DeathZone`] back to their [`SpawnPoint`], and
/// queues other moving bodies that touch one for destruction.
///
/// Static geometry overlapping a zone is left alone.
#[derive(Debug, Default)]
pub struct DeathZoneSystem {
    respawns: u64,
}

impl DeathZoneSystem {
    /// Total player respawns so far.
    pub fn respawns(&self) -> u64 {
        self.respawns
    }
}

impl UpdateSystem for DeathZoneSystem {
    fn update(&mut self, ctx: &mut TickContext<'_>) {
        let mut victims: Vec<EntityId> = Vec::new();
        for event in ctx.events.iter() {
            let zone_hit = ctx.world.has::<DeathZone>(event.other)
                && !ctx.world.has::<DeathZone>(event.entity);
            if zone_hit && !victims.contains(&event.entity) {
                victims.push(event.entity);
            }
        }

        for entity in victims {
            if ctx.world.has::<Player>(entity) {
                let Some(spawn) = ctx.world.try_get::<SpawnPoint>(entity).copied() else {
                    warn!(%entity, "player touched a death zone but has no spawn point");
                    continue;
                };
                if let Some(transform) = ctx.world.try_get_mut::<Transform>(entity) {
                    transform.position.x = spawn.position.x;
                    transform.position.y = spawn.position.y;
                }
                if let Some(body) = ctx.world.try_get_mut::<Rigidbody>(entity) {
                    body.velocity = Vec2::ZERO;
                    body.force = Vec2::ZERO;
                    body.on_ground = false;
                }
                self.respawns += 1;
                debug!(%entity, x = spawn.position.x, y = spawn.position.y, "player respawned");
            } else if ctx.world.has::<Rigidbody>(entity) {
                debug!(%entity, "body fell into a death zone");
                ctx.commands.destroy(entity);
            }
        }
    }

    fn name(&self) -> &str {
        "death_zones"
    }
}

// ---------------------------------------------------------------------------
// Followers
// ---------------------------------------------------------------------------

/// Moves each [`Follower`] onto its target plus offset. Followers whose
/// target no longer exists are queued for destruction.
#[derive(Debug, Default)]
pub struct FollowSystem;

impl UpdateSystem for FollowSystem {
    fn update(&mut self, ctx: &mut TickContext<'_>) {
        let mut followers: Vec<(EntityId, Follower)> = Vec::new();
        ctx.world
            .view1::<Follower>(|entity, follower| followers.push((entity, *follower)));

        for (entity, follower) in followers {
            if !ctx.world.is_alive(follower.target) {
                debug!(%entity, target = %follower.target, "follow target gone");
                ctx.commands.destroy(entity);
                continue;
            }
            // Alive but unplaced: nothing to follow this tick.
            let Some(anchor) = ctx.world.try_get::<Transform>(follower.target) else {
                continue;
            };
            let x = anchor.position.x + follower.offset.x;
            let y = anchor.position.y + follower.offset.y;
            match ctx.world.try_get_mut::<Transform>(entity) {
                Some(transform) => {
                    transform.position.x = x;
                    transform.position.y = y;
                }
                None => {
                    ctx.world.add(entity, Transform::at(x, y));
                }
            }
        }
    }

    fn name(&self) -> &str {
        "followers"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
