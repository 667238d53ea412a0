//! Property tests for world operations.
//!
//! Random operation sequences run against a [`World`] and a plain
//! `HashMap` model side by side; after every step the world must agree with
//! the model on liveness, component presence and view membership.

use std::collections::{BTreeSet, HashMap, HashSet};

use duet_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Pos {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Vel {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Tag(u32);

#[derive(Debug, Default, Clone)]
struct Model {
    pos: Option<Pos>,
    vel: Option<Vel>,
    tag: Option<u32>,
}

/// Operations we can perform on the world.
#[derive(Debug, Clone)]
enum WorldOp {
    Create,
    Destroy(usize),
    DestroyStale(usize),
    AddPos(usize, f32, f32),
    AddVel(usize, f32, f32),
    AddTag(usize, u32),
    RemovePos(usize),
    RemoveVel(usize),
    Integrate,
}

/// Finite f32 values only, so equality comparisons stay meaningful.
fn finite_f32() -> impl Strategy<Value = f32> {
    (-100_000i32..100_000i32).prop_map(|v| v as f32 * 0.01)
}

fn world_op_strategy() -> impl Strategy<Value = WorldOp> {
    prop_oneof![
        3 => Just(WorldOp::Create),
        1 => (0..64usize).prop_map(WorldOp::Destroy),
        1 => (0..64usize).prop_map(WorldOp::DestroyStale),
        2 => (0..64usize, finite_f32(), finite_f32())
            .prop_map(|(i, x, y)| WorldOp::AddPos(i, x, y)),
        2 => (0..64usize, finite_f32(), finite_f32())
            .prop_map(|(i, dx, dy)| WorldOp::AddVel(i, dx, dy)),
        1 => (0..64usize, any::<u32>()).prop_map(|(i, t)| WorldOp::AddTag(i, t)),
        1 => (0..64usize).prop_map(WorldOp::RemovePos),
        1 => (0..64usize).prop_map(WorldOp::RemoveVel),
        1 => Just(WorldOp::Integrate),
    ]
}

fn pick(alive: &[EntityId], idx: usize) -> Option<EntityId> {
    (!alive.is_empty()).then(|| alive[idx % alive.len()])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn world_matches_model(ops in prop::collection::vec(world_op_strategy(), 1..80)) {
        let mut world = World::new();
        let mut model: HashMap<EntityId, Model> = HashMap::new();
        let mut alive: Vec<EntityId> = Vec::new();
        let mut dead: Vec<EntityId> = Vec::new();
        let mut issued: HashSet<EntityId> = HashSet::new();

        for op in ops {
            match op {
                WorldOp::Create => {
                    let e = world.create();
                    prop_assert!(!e.is_none());
                    // Never reissued, even after destroys.
                    prop_assert!(issued.insert(e));
                    alive.push(e);
                    model.insert(e, Model::default());
                }
                WorldOp::Destroy(idx) => {
                    if let Some(e) = pick(&alive, idx) {
                        prop_assert!(world.destroy(e));
                        alive.retain(|&a| a != e);
                        model.remove(&e);
                        dead.push(e);
                    }
                }
                WorldOp::DestroyStale(idx) => {
                    if let Some(e) = pick(&dead, idx) {
                        prop_assert!(!world.destroy(e));
                    }
                }
                WorldOp::AddPos(idx, x, y) => {
                    if let Some(e) = pick(&alive, idx) {
                        world.add(e, Pos { x, y });
                        model.entry(e).or_default().pos = Some(Pos { x, y });
                    }
                }
                WorldOp::AddVel(idx, dx, dy) => {
                    if let Some(e) = pick(&alive, idx) {
                        world.add(e, Vel { dx, dy });
                        model.entry(e).or_default().vel = Some(Vel { dx, dy });
                    }
                }
                WorldOp::AddTag(idx, t) => {
                    if let Some(e) = pick(&alive, idx) {
                        world.add(e, Tag(t));
                        model.entry(e).or_default().tag = Some(t);
                    }
                }
                WorldOp::RemovePos(idx) => {
                    if let Some(e) = pick(&alive, idx) {
                        let expected = model.entry(e).or_default().pos.take();
                        prop_assert_eq!(world.remove::<Pos>(e), expected);
                    }
                }
                WorldOp::RemoveVel(idx) => {
                    if let Some(e) = pick(&alive, idx) {
                        let expected = model.entry(e).or_default().vel.take();
                        prop_assert_eq!(world.remove::<Vel>(e), expected);
                    }
                }
                WorldOp::Integrate => {
                    world.view2_mut::<Pos, Vel>(|_, pos, vel| {
                        pos.x += vel.dx;
                        pos.y += vel.dy;
                    });
                    for m in model.values_mut() {
                        if let (Some(pos), Some(vel)) = (m.pos.as_mut(), m.vel.as_ref()) {
                            pos.x += vel.dx;
                            pos.y += vel.dy;
                        }
                    }
                }
            }

            // Liveness agrees.
            prop_assert_eq!(world.entity_count(), alive.len());
            for &e in &dead {
                prop_assert!(!world.is_alive(e));
                prop_assert!(world.component_names(e).is_empty());
            }

            // Component presence and values agree.
            for (&e, m) in &model {
                prop_assert!(world.is_alive(e));
                prop_assert_eq!(world.try_get::<Pos>(e), m.pos.as_ref());
                prop_assert_eq!(world.try_get::<Vel>(e), m.vel.as_ref());
                prop_assert_eq!(world.try_get::<Tag>(e).map(|t| t.0), m.tag);
            }

            // View membership: exactly the entities owning every listed type,
            // each visited once.
            let mut visited = Vec::new();
            world.view2::<Pos, Vel>(|e, _, _| visited.push(e));
            let unique: BTreeSet<EntityId> = visited.iter().copied().collect();
            prop_assert_eq!(unique.len(), visited.len());
            let expected: BTreeSet<EntityId> = model
                .iter()
                .filter(|(_, m)| m.pos.is_some() && m.vel.is_some())
                .map(|(&e, _)| e)
                .collect();
            prop_assert_eq!(unique, expected);
        }
    }

    /// Destroy removes every component type, however many were attached.
    #[test]
    fn destroy_is_complete(
        with_pos in any::<bool>(),
        with_vel in any::<bool>(),
        with_tag in any::<bool>(),
    ) {
        let mut world = World::new();
        let keep = world.create();
        world.add(keep, Tag(0));
        let e = world.create();
        if with_pos { world.add(e, Pos { x: 0.0, y: 0.0 }); }
        if with_vel { world.add(e, Vel { dx: 0.0, dy: 0.0 }); }
        if with_tag { world.add(e, Tag(1)); }

        world.destroy(e);

        prop_assert!(!world.has::<Pos>(e));
        prop_assert!(!world.has::<Vel>(e));
        prop_assert!(!world.has::<Tag>(e));
        prop_assert!(world.has::<Tag>(keep));
    }
}
