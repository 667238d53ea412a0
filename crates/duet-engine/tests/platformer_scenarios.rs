//! End-to-end stage scenarios driven through `Simulation`.

use std::cell::RefCell;
use std::rc::Rc;

use duet_engine::prelude::*;

fn platformer() -> Simulation {
    Simulation::platformer(World::new(), &EngineConfig::default())
}

fn physics_only() -> Simulation {
    let mut sim = Simulation::new(World::new(), TickConfig::default());
    sim.systems_mut().add_update(PhysicsStepSystem::default());
    sim
}

fn dynamic_box(world: &mut World, x: f32, y: f32, half: f32) -> EntityId {
    let e = world.create();
    world.add(e, Transform::at(x, y));
    world.add(e, Collider::aabb(half, half));
    world.add(e, Rigidbody::default());
    e
}

fn static_box(world: &mut World, x: f32, y: f32, hw: f32, hh: f32) -> EntityId {
    let e = world.create();
    world.add(e, Transform::at(x, y));
    world.add(e, Collider::aabb(hw, hh).fixed());
    e
}

// ---------------------------------------------------------------------------
// Resting contact
// ---------------------------------------------------------------------------

#[test]
fn box_falls_and_rests_on_floor() {
    let mut sim = physics_only();
    let world = sim.world_mut();
    let floor = static_box(world, 0.0, 0.0, 5.0, 0.5);
    // Bottom edge starts two units above the floor's top edge.
    let p = dynamic_box(world, 0.0, 3.0, 0.5);

    sim.run_ticks(240);

    let slop = PhysicsConfig::default().slop;
    let expected = 0.5 + 0.5;
    let y = sim.world().get::<Transform>(p).position.y;
    assert!((y - expected).abs() <= slop, "resting y = {y}");
    assert!(sim.world().get::<Rigidbody>(p).on_ground);
    assert!(sim.world().get::<Rigidbody>(p).velocity.y.abs() < 1e-6);
    assert_eq!(sim.world().get::<Transform>(floor).position.y, 0.0);
}

#[test]
fn two_boxes_stack_without_sinking_through() {
    let mut sim = physics_only();
    let world = sim.world_mut();
    static_box(world, 0.0, 0.0, 5.0, 0.5);
    let lower = dynamic_box(world, 0.0, 1.5, 0.5);
    let upper = dynamic_box(world, 0.0, 3.0, 0.5);

    sim.run_ticks(600);

    let lower_y = sim.world().get::<Transform>(lower).position.y;
    let upper_y = sim.world().get::<Transform>(upper).position.y;
    assert!((lower_y - 1.0).abs() < 0.1, "lower y = {lower_y}");
    assert!((upper_y - 2.0).abs() < 0.15, "upper y = {upper_y}");
    assert!(upper_y > lower_y + 0.8);
    assert!(sim.world().get::<Rigidbody>(upper).on_ground);
}

#[test]
fn runner_is_stopped_by_a_wall() {
    let mut sim = physics_only();
    let world = sim.world_mut();
    static_box(world, 0.0, 0.0, 20.0, 0.5);
    spawn_wall(world, Vec2::new(5.0, 3.0), Vec2::new(0.5, 3.0));
    let runner = dynamic_box(world, 0.0, 1.0, 0.5);
    world.get_mut::<Rigidbody>(runner).velocity.x = 6.0;

    for _ in 0..180 {
        // Keep pushing right every tick.
        sim.world_mut().get_mut::<Rigidbody>(runner).add_force(Vec2::new(30.0, 0.0));
        sim.tick();
    }

    let x = sim.world().get::<Transform>(runner).position.x;
    assert!(x < 4.0 + 0.2, "runner tunnelled to x = {x}");
    assert!(sim.world().get::<Rigidbody>(runner).on_ground, "wall contact does not unground");
}

// ---------------------------------------------------------------------------
// Triggers and statics
// ---------------------------------------------------------------------------

#[test]
fn trigger_overlap_is_reported_but_never_pushed() {
    let mut sim = physics_only();
    let world = sim.world_mut();
    let zone = world.create();
    world.add(zone, Transform::at(0.0, 0.0));
    world.add(zone, Collider::aabb(3.0, 3.0).trigger());
    world.add(
        zone,
        Rigidbody {
            use_gravity: false,
            ..Rigidbody::default()
        },
    );
    let visitor = dynamic_box(world, 0.5, 0.0, 0.5);
    world.get_mut::<Rigidbody>(visitor).use_gravity = false;

    sim.run_ticks(10);

    assert!(sim.events().contains_pair(zone, visitor));
    assert!(sim.events().contains_pair(visitor, zone));
    assert!(sim.events().iter().all(|e| e.trigger));
    assert_eq!(sim.world().get::<Transform>(zone).position.xy(), Vec2::ZERO);
    assert_eq!(
        sim.world().get::<Transform>(visitor).position.xy(),
        Vec2::new(0.5, 0.0)
    );
}

#[test]
fn static_colliders_never_move() {
    let mut sim = physics_only();
    let world = sim.world_mut();
    let a = static_box(world, 0.0, 0.0, 1.0, 1.0);
    let b = static_box(world, 0.5, 0.5, 1.0, 1.0);
    for i in 0..5 {
        dynamic_box(world, i as f32 * 0.3 - 0.6, 0.8, 0.5);
    }

    sim.run_ticks(120);

    assert_eq!(sim.world().get::<Transform>(a).position.xy(), Vec2::ZERO);
    assert_eq!(sim.world().get::<Transform>(b).position.xy(), Vec2::new(0.5, 0.5));
}

// ---------------------------------------------------------------------------
// Broad phase
// ---------------------------------------------------------------------------

#[test]
fn distant_scenery_pairs_are_pruned() {
    let mut sim = Simulation::new(World::new(), TickConfig::default());
    sim.systems_mut()
        .add_update(Collision2DSystem::new(CollisionConfig::default()));
    let world = sim.world_mut();
    let p = spawn_player(world, 0, Vec2::ZERO);
    let far_a = static_box(world, 1000.0, 0.0, 2.0, 2.0);
    let far_b = static_box(world, 1001.0, 0.0, 2.0, 2.0);

    sim.tick();
    assert!(!sim.events().contains_pair(far_a, far_b));
    assert!(sim.events().touching(p).next().is_none());

    let stats = sim
        .systems()
        .get_update::<Collision2DSystem>()
        .map(|s| s.last_stats())
        .unwrap_or_default();
    assert!(stats.pruned >= 1);
}

#[test]
fn no_players_means_no_pruning() {
    let mut sim = Simulation::new(World::new(), TickConfig::default());
    sim.systems_mut()
        .add_update(Collision2DSystem::new(CollisionConfig::default()));
    let world = sim.world_mut();
    let far_a = static_box(world, 1000.0, 0.0, 2.0, 2.0);
    let far_b = static_box(world, 1001.0, 0.0, 2.0, 2.0);

    sim.tick();
    assert!(sim.events().contains_pair(far_a, far_b));
    assert!(sim.events().contains_pair(far_b, far_a));
    assert!(!sim.events().iter().any(|e| e.trigger));
}

// ---------------------------------------------------------------------------
// Two-player stage
// ---------------------------------------------------------------------------

#[test]
fn both_players_reach_the_goal_and_clear_the_stage() {
    let mut sim = platformer();
    let world = sim.world_mut();
    spawn_platform(world, Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.5));
    let p0 = spawn_player(world, 0, Vec2::new(-3.0, 1.5));
    let p1 = spawn_player(world, 1, Vec2::new(3.0, 1.5));
    spawn_goal(world, Vec2::new(8.0, 1.5), Vec2::new(1.0, 1.0));

    for _ in 0..300 {
        for p in [p0, p1] {
            let x = sim.world().get::<Transform>(p).position.x;
            if x < 8.0 {
                sim.world_mut().get_mut::<Rigidbody>(p).velocity.x = 4.0;
            } else {
                sim.world_mut().get_mut::<Rigidbody>(p).velocity.x = 0.0;
            }
        }
        sim.tick();
    }

    let goals = sim.systems().get_update::<GoalSystem>();
    assert!(goals.is_some_and(|g| g.progress().cleared()));
}

#[test]
fn falling_player_respawns_and_crate_is_removed() {
    let mut sim = platformer();
    let world = sim.world_mut();
    spawn_platform(world, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.5));
    spawn_death_zone(world, Vec2::new(0.0, -20.0), Vec2::new(100.0, 2.0));
    let p = spawn_player(world, 0, Vec2::new(0.0, 1.5));
    world.get_mut::<Transform>(p).position.x = 10.0;
    let lost = spawn_crate(world, Vec2::new(-10.0, 1.0), 0.5);

    let mut respawned = false;
    for _ in 0..240 {
        sim.tick();
        let x = sim.world().get::<Transform>(p).position.x;
        if x == 0.0 {
            respawned = true;
            break;
        }
    }

    assert!(respawned, "player never respawned");
    assert!(!sim.world().is_alive(lost));
    let zones = sim.systems().get_update::<DeathZoneSystem>();
    assert_eq!(zones.map(|z| z.respawns()), Some(1));
}

#[test]
fn name_tag_follows_until_its_target_is_gone() {
    let mut sim = platformer();
    let world = sim.world_mut();
    spawn_platform(world, Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.5));
    let p = spawn_player(world, 0, Vec2::new(0.0, 1.5));
    let tag = spawn_follower(world, p, Vec2::new(0.0, 1.5));

    sim.run_ticks(60);
    let player_y = sim.world().get::<Transform>(p).position.y;
    let tag_y = sim.world().get::<Transform>(tag).position.y;
    assert!((tag_y - (player_y + 1.5)).abs() < 1e-4);

    sim.commands_mut().destroy(p);
    sim.run_ticks(2);
    assert!(!sim.world().is_alive(tag));
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    label: &'static str,
    log: Log,
}

impl UpdateSystem for Recorder {
    fn update(&mut self, _ctx: &mut TickContext<'_>) {
        self.log.borrow_mut().push(format!("update:{}", self.label));
    }

    fn name(&self) -> &str {
        self.label
    }
}

struct Painter {
    log: Log,
}

impl RenderSystem for Painter {
    fn render(&mut self, _world: &World, _events: &CollisionEventBuffer) {
        self.log.borrow_mut().push("render".to_owned());
    }
}

#[test]
fn updates_finish_before_render_in_registration_order() {
    let log = Log::default();
    let mut sim = Simulation::new(World::new(), TickConfig::default());
    sim.systems_mut().add_render(Painter { log: log.clone() });
    sim.systems_mut().add_update(Recorder {
        label: "a",
        log: log.clone(),
    });
    sim.systems_mut().add_update(Recorder {
        label: "b",
        log: log.clone(),
    });

    let dt = sim.config().fixed_dt;
    let ran = sim.advance(std::time::Duration::from_secs_f32(dt * 2.5));
    assert_eq!(ran, 2);
    assert_eq!(
        *log.borrow(),
        vec!["update:a", "update:b", "update:a", "update:b", "render"]
    );
}
