//! Multi-component views over a [`World`].
//!
//! A view visits every entity that owns *all* of the requested component
//! types, exactly once. The first type parameter is the primary storage: it
//! is walked in its internal order and every other storage is looked up by id.
//! Putting the rarest component first is therefore the cheap ordering.
//!
//! The callback only ever sees component references, never the world, so
//! structural changes during iteration are impossible. Queue those on a
//! [`CommandBuffer`](crate::command::CommandBuffer) instead.
//!
//! ```
//! use duet_ecs::prelude::*;
//!
//! struct Pos(f32);
//! struct Vel(f32);
//!
//! let mut world = World::new();
//! let e = world.create();
//! world.add(e, Pos(1.0));
//! world.add(e, Vel(2.0));
//!
//! world.view2_mut::<Pos, Vel>(|_, pos, vel| pos.0 += vel.0);
//!
//! let mut total = 0.0;
//! world.view1::<Pos>(|_, pos| total += pos.0);
//! assert_eq!(total, 3.0);
//! ```

use std::any::TypeId;

use crate::component::{Component, ComponentStorage};
use crate::entity::EntityId;
use crate::world::World;

/// Panics if any component type appears twice in a mutable view.
#[track_caller]
fn assert_distinct(types: &[(TypeId, &'static str)]) {
    for (i, (a, name)) in types.iter().enumerate() {
        if types[i + 1..].iter().any(|(b, _)| a == b) {
            panic!("mutable view requests `{name}` more than once");
        }
    }
}

macro_rules! impl_views {
    ($view:ident, $view_mut:ident; $head:ident $(, $tail:ident $store:ident $item:ident)*) => {
        impl World {
            /// Visit every entity owning all listed component types, with
            /// shared access. Entities missing any of them are skipped; a type
            /// that was never added yields no calls.
            pub fn $view<$head: Component $(, $tail: Component)*>(
                &self,
                mut f: impl FnMut(EntityId, &$head $(, &$tail)*),
            ) {
                let Some(primary) = self.components.storage::<$head>() else {
                    return;
                };
                $(
                    let Some($store) = self.components.storage::<$tail>() else {
                        return;
                    };
                )*
                for (entity, head) in primary.iter() {
                    $(
                        let Some($item) = $store.get(entity) else {
                            continue;
                        };
                    )*
                    f(entity, head $(, $item)*);
                }
            }

            /// Visit every entity owning all listed component types, with
            /// exclusive access to each.
            ///
            /// # Panics
            ///
            /// Panics if the same component type is listed more than once.
            #[track_caller]
            pub fn $view_mut<$head: Component $(, $tail: Component)*>(
                &mut self,
                mut f: impl FnMut(EntityId, &mut $head $(, &mut $tail)*),
            ) {
                assert_distinct(&[
                    (TypeId::of::<$head>(), std::any::type_name::<$head>())
                    $(, (TypeId::of::<$tail>(), std::any::type_name::<$tail>()))*
                ]);

                let mut primary: Option<&mut ComponentStorage<$head>> = None;
                $(let mut $store: Option<&mut ComponentStorage<$tail>> = None;)*
                for (type_id, storage) in self.components.storages_mut() {
                    if type_id == TypeId::of::<$head>() {
                        primary = storage.as_any_mut().downcast_mut();
                    }
                    $(
                        else if type_id == TypeId::of::<$tail>() {
                            $store = storage.as_any_mut().downcast_mut();
                        }
                    )*
                }

                let Some(primary) = primary else {
                    return;
                };
                $(
                    let Some($store) = $store else {
                        return;
                    };
                )*
                for (entity, head) in primary.iter_mut() {
                    $(
                        let Some($item) = $store.get_mut(entity) else {
                            continue;
                        };
                    )*
                    f(entity, head $(, $item)*);
                }
            }
        }
    };
}

impl_views!(view1, view1_mut; A);
impl_views!(view2, view2_mut; A, B b_store b);
impl_views!(view3, view3_mut; A, B b_store b, C c_store c);
impl_views!(view4, view4_mut; A, B b_store b, C c_store c, D d_store d);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct A(i32);
    #[derive(Debug, Clone, PartialEq)]
    struct B(i32);
    #[derive(Debug, Clone, PartialEq)]
    struct C(i32);
    #[derive(Debug, Clone, PartialEq)]
    struct D(i32);

    /// e1={A}, e2={A,B}, e3={A,B,C}, e4={B,C}
    fn four_entities() -> (World, [EntityId; 4]) {
        let mut world = World::new();
        let e1 = world.create();
        let e2 = world.create();
        let e3 = world.create();
        let e4 = world.create();
        world.add(e1, A(1));
        world.add(e2, A(2));
        world.add(e2, B(20));
        world.add(e3, A(3));
        world.add(e3, B(30));
        world.add(e3, C(300));
        world.add(e4, B(40));
        world.add(e4, C(400));
        (world, [e1, e2, e3, e4])
    }

    fn sorted(mut ids: Vec<EntityId>) -> Vec<EntityId> {
        ids.sort();
        ids
    }

    #[test]
    fn view_visits_exactly_the_matching_entities() {
        let (world, [e1, e2, e3, e4]) = four_entities();

        let mut ab = Vec::new();
        world.view2::<A, B>(|e, _, _| ab.push(e));
        assert_eq!(sorted(ab), vec![e2, e3]);

        let mut bc = Vec::new();
        world.view2::<B, C>(|e, _, _| bc.push(e));
        assert_eq!(sorted(bc), vec![e3, e4]);

        let mut abc = Vec::new();
        world.view3::<A, B, C>(|e, _, _, _| abc.push(e));
        assert_eq!(abc, vec![e3]);

        let mut a = Vec::new();
        world.view1::<A>(|e, _| a.push(e));
        assert_eq!(sorted(a), vec![e1, e2, e3]);
    }

    #[test]
    fn primary_order_does_not_change_the_result_set() {
        let (world, _) = four_entities();
        let mut ab = Vec::new();
        world.view2::<A, B>(|e, _, _| ab.push(e));
        let mut ba = Vec::new();
        world.view2::<B, A>(|e, _, _| ba.push(e));
        assert_eq!(sorted(ab), sorted(ba));
    }

    #[test]
    fn view_passes_the_right_components() {
        let (world, [_, e2, _, _]) = four_entities();
        world.view2::<A, B>(|e, a, b| {
            if e == e2 {
                assert_eq!((a, b), (&A(2), &B(20)));
            }
            assert_eq!(b.0, a.0 * 10);
        });
    }

    #[test]
    fn view_mut_writes_through() {
        let (mut world, [e1, e2, e3, _]) = four_entities();
        world.view2_mut::<A, B>(|_, a, b| {
            a.0 += b.0;
            b.0 = 0;
        });
        assert_eq!(world.get::<A>(e1), &A(1));
        assert_eq!(world.get::<A>(e2), &A(22));
        assert_eq!(world.get::<A>(e3), &A(33));
        assert_eq!(world.get::<B>(e3), &B(0));
    }

    #[test]
    fn view4_needs_all_four() {
        let (mut world, [_, _, e3, _]) = four_entities();
        let mut hits = 0;
        world.view4::<A, B, C, D>(|_, _, _, _, _| hits += 1);
        assert_eq!(hits, 0);

        world.add(e3, D(3000));
        world.view4_mut::<D, C, B, A>(|e, d, c, b, a| {
            assert_eq!(e, e3);
            d.0 += c.0 + b.0 + a.0;
            hits += 1;
        });
        assert_eq!(hits, 1);
        assert_eq!(world.get::<D>(e3), &D(3333));
    }

    #[test]
    fn unknown_component_type_yields_no_calls() {
        let (mut world, _) = four_entities();
        let mut hits = 0;
        world.view2::<A, D>(|_, _, _| hits += 1);
        world.view1_mut::<D>(|_, _| hits += 1);
        world.view2_mut::<D, A>(|_, _, _| hits += 1);
        assert_eq!(hits, 0);
    }

    #[test]
    fn view_mut_leaves_storages_in_place() {
        let (mut world, [_, e2, _, _]) = four_entities();
        world.view2_mut::<A, D>(|_, _, _| {});
        assert_eq!(world.get::<A>(e2), &A(2));
        assert_eq!(world.count::<B>(), 3);
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn duplicate_type_in_mutable_view_panics() {
        let (mut world, _) = four_entities();
        world.view2_mut::<A, A>(|_, _, _| {});
    }

    #[test]
    fn destroyed_entities_are_not_visited() {
        let (mut world, [_, e2, e3, _]) = four_entities();
        world.destroy(e2);
        let mut ab = Vec::new();
        world.view2::<A, B>(|e, _, _| ab.push(e));
        assert_eq!(ab, vec![e3]);
    }
}
