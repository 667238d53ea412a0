//! Fixed-timestep simulation driver.
//!
//! A [`Simulation`] owns the world and everything the systems share. Each
//! tick:
//!
//! 1. Every update system runs in registration order with a [`TickContext`].
//! 2. The command buffer is applied to the world (FIFO).
//! 3. The tick counter advances.
//!
//! Render systems run separately, through [`Simulation::render`] or once per
//! [`Simulation::advance`] call that ran at least one tick. They never
//! interleave with update systems.
//!
//! # Example
//!
//! ```
//! use duet_engine::prelude::*;
//!
//! let mut sim = Simulation::new(World::new(), TickConfig::default());
//! sim.systems_mut().add_update(PhysicsStepSystem::default());
//!
//! let crate_box = sim.world_mut().create();
//! sim.world_mut().add(crate_box, Transform::at(0.0, 10.0));
//! sim.world_mut().add(crate_box, Rigidbody::default());
//!
//! sim.run_ticks(60);
//! assert_eq!(sim.tick_count(), 60);
//! assert!(sim.world().get::<Transform>(crate_box).position.y < 10.0);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use duet_ecs::command::{ApplyReport, CommandBuffer};
use duet_ecs::world::World;

use crate::config::EngineConfig;
use crate::events::CollisionEventBuffer;
use crate::gameplay::{DeathZoneSystem, FollowSystem, GoalSystem};
use crate::physics::PhysicsStepSystem;
use crate::schedule::{SystemRegistry, SystemTiming, TickContext};

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Timestep settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Seconds per tick. Must be positive and finite.
    pub fixed_dt: f32,
    /// Most ticks a single [`Simulation::advance`] call may run. Backlog past
    /// this is dropped so a long stall cannot snowball.
    pub max_steps_per_advance: u32,
}

impl Default for TickConfig {
    /// 60 Hz, at most 8 catch-up ticks per frame.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_steps_per_advance: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing and command counts for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per update system, in execution order.
    pub system_times: Vec<SystemTiming>,
    /// Time spent applying commands.
    pub command_apply_time: Duration,
    /// Systems plus command apply.
    pub total_time: Duration,
    /// Commands that changed the world.
    pub commands_applied: usize,
    /// Commands skipped because their target was gone.
    pub commands_stale: usize,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// The world, its shared buffers, and the ordered systems that advance it.
pub struct Simulation {
    world: World,
    events: CollisionEventBuffer,
    commands: CommandBuffer,
    systems: SystemRegistry,
    config: TickConfig,
    tick_counter: u64,
    /// Unsimulated wall time carried between `advance` calls, in seconds.
    accumulator: f64,
    last_diagnostics: TickDiagnostics,
    last_render_times: Vec<SystemTiming>,
}

impl Simulation {
    /// Wrap `world` with an empty system registry.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(world: World, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            world,
            events: CollisionEventBuffer::new(),
            commands: CommandBuffer::new(),
            systems: SystemRegistry::new(),
            config,
            tick_counter: 0,
            accumulator: 0.0,
            last_diagnostics: TickDiagnostics::default(),
            last_render_times: Vec::new(),
        }
    }

    /// The standard two-player stage pipeline: physics (which detects
    /// contacts), then goals, death zones and followers.
    pub fn platformer(world: World, config: &EngineConfig) -> Self {
        let mut sim = Self::new(world, config.tick);
        sim.systems
            .add_update(PhysicsStepSystem::new(config.physics, config.collision));
        sim.systems.add_update(GoalSystem::default());
        sim.systems.add_update(DeathZoneSystem::default());
        sim.systems.add_update(FollowSystem);
        sim
    }

    // -- stepping -----------------------------------------------------------

    /// Run one fixed tick. Returns the outcome of the command apply.
    pub fn tick(&mut self) -> ApplyReport {
        let tick_start = Instant::now();

        let mut ctx = TickContext {
            world: &mut self.world,
            events: &mut self.events,
            commands: &mut self.commands,
            dt: self.config.fixed_dt,
            tick: self.tick_counter,
        };
        let system_times = self.systems.tick(&mut ctx);

        let apply_start = Instant::now();
        let report = self.commands.apply(&mut self.world);
        let command_apply_time = apply_start.elapsed();

        self.tick_counter += 1;

        self.last_diagnostics = TickDiagnostics {
            system_times,
            command_apply_time,
            total_time: tick_start.elapsed(),
            commands_applied: report.success_count,
            commands_stale: report.failed_count,
        };
        report
    }

    /// Run `count` ticks back to back. Returns the total number of commands
    /// processed, applied or skipped.
    pub fn run_ticks(&mut self, count: u64) -> u64 {
        let mut total = 0u64;
        for _ in 0..count {
            let report = self.tick();
            total += (report.success_count + report.failed_count) as u64;
        }
        total
    }

    /// Run every render system once against the current state.
    pub fn render(&mut self) {
        self.last_render_times = self.systems.render(&self.world, &self.events);
    }

    /// Feed `elapsed` wall time into the accumulator and run as many whole
    /// ticks as fit, up to `max_steps_per_advance`. Renders once if any tick
    /// ran. Returns the number of ticks run.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let dt = f64::from(self.config.fixed_dt);
        self.accumulator += elapsed.as_secs_f64();

        let mut ran = 0u32;
        while self.accumulator >= dt && ran < self.config.max_steps_per_advance {
            self.tick();
            self.accumulator -= dt;
            ran += 1;
        }
        if self.accumulator >= dt {
            let dropped = (self.accumulator / dt).floor();
            self.accumulator -= dropped * dt;
            debug!(ran, dropped, "advance capped, backlog dropped");
        }

        if ran > 0 {
            self.render();
        }
        ran
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulated seconds, computed as `tick_count * fixed_dt` so it never
    /// drifts.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * f64::from(self.config.fixed_dt)
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for setup and tests. Systems should go through
    /// their [`TickContext`].
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Contacts from the most recent detection pass.
    pub fn events(&self) -> &CollisionEventBuffer {
        &self.events
    }

    /// Commands queued from outside a tick. Applied after the next tick's
    /// update systems.
    pub fn commands_mut(&mut self) -> &mut CommandBuffer {
        &mut self.commands
    }

    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut SystemRegistry {
        &mut self.systems
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    /// Per-system timings of the most recent render pass.
    pub fn last_render_times(&self) -> &[SystemTiming] {
        &self.last_render_times
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick_counter)
            .field("entities", &self.world.entity_count())
            .field("events", &self.events.len())
            .field("systems", &self.systems)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
