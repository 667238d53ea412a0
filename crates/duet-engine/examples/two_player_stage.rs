//! Headless two-player stage: both players run right, hop a gap, and reach
//! the exit. Positions are logged once per simulated second.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example two_player_stage -p duet-engine [-- config.json]
//!
//! The optional argument is an engine config file; omitted fields keep their
//! defaults.

use std::time::Duration;

use anyhow::Context;
use duet_engine::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Scripted input: run right, jump when grounded near a gap edge.
struct Autopilot {
    run_speed: f32,
    jump_speed: f32,
    gap_edges: Vec<f32>,
}

impl UpdateSystem for Autopilot {
    fn update(&mut self, ctx: &mut TickContext<'_>) {
        let mut players = Vec::new();
        ctx.world
            .view2::<Player, Transform>(|e, _, t| players.push((e, t.position.x)));

        for (entity, x) in players {
            let Some(body) = ctx.world.try_get_mut::<Rigidbody>(entity) else {
                continue;
            };
            body.velocity.x = self.run_speed;
            let near_edge = self.gap_edges.iter().any(|&edge| (edge - x).abs() < 0.5);
            if body.on_ground && near_edge {
                body.velocity.y = self.jump_speed;
            }
        }
    }

    fn name(&self) -> &str {
        "autopilot"
    }
}

/// Logs player positions once per simulated second.
struct PositionLog {
    frames: u64,
    every: u64,
}

impl RenderSystem for PositionLog {
    fn render(&mut self, world: &World, events: &CollisionEventBuffer) {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return;
        }
        world.view3::<Player, Transform, Rigidbody>(|e, player, t, body| {
            info!(
                player = player.index,
                entity = %e,
                x = t.position.x,
                y = t.position.y,
                grounded = body.on_ground,
                contacts = events.touching(e).count(),
                "position"
            );
        });
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

fn build_stage(world: &mut World) -> Vec<f32> {
    spawn_platform(world, Vec2::new(-5.0, 0.0), Vec2::new(10.0, 0.5));
    spawn_platform(world, Vec2::new(22.0, 0.0), Vec2::new(15.0, 0.5));
    spawn_wall(world, Vec2::new(-15.5, 5.0), Vec2::new(0.5, 5.0));
    spawn_goal(world, Vec2::new(34.0, 2.0), Vec2::new(1.0, 1.5));
    spawn_death_zone(world, Vec2::new(10.0, -15.0), Vec2::new(60.0, 2.0));

    for (index, x) in [(0u8, -12.0), (1, -9.0)] {
        let player = spawn_player(world, index, Vec2::new(x, 1.5));
        spawn_follower(world, player, Vec2::new(0.0, 1.4));
    }
    spawn_crate(world, Vec2::new(0.0, 3.0), 0.5);

    for i in 0..40 {
        let x = -200.0 + i as f32 * 10.0;
        spawn_decoration(world, Vec2::new(x, 30.0), Vec2::new(2.0, 2.0));
    }

    // The gap between the two platforms spans x = 5..7.
    vec![4.5]
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_path(&path)
            .with_context(|| format!("loading engine config from {path}"))?,
        None => EngineConfig::default(),
    };

    let mut sim = Simulation::platformer(World::new(), &config);
    let gap_edges = build_stage(sim.world_mut());
    let ticks_per_second = (1.0 / config.tick.fixed_dt).round() as u64;
    sim.systems_mut().add_update(Autopilot {
        run_speed: 4.0,
        jump_speed: 9.0,
        gap_edges,
    });
    sim.systems_mut().add_render(PositionLog {
        frames: 0,
        every: ticks_per_second.max(1),
    });

    let frame = Duration::from_secs_f32(config.tick.fixed_dt);
    let max_ticks = ticks_per_second * 30;
    while sim.tick_count() < max_ticks {
        sim.advance(frame);
        let cleared = sim
            .systems()
            .get_update::<GoalSystem>()
            .is_some_and(|g| g.progress().cleared());
        if cleared {
            break;
        }
    }

    let goals = sim
        .systems()
        .get_update::<GoalSystem>()
        .context("goal system missing from the pipeline")?;
    let respawns = sim
        .systems()
        .get_update::<DeathZoneSystem>()
        .map_or(0, |d| d.respawns());
    info!(
        ticks = sim.tick_count(),
        seconds = sim.sim_time(),
        cleared = goals.progress().cleared(),
        respawns,
        "stage finished"
    );
    Ok(())
}
