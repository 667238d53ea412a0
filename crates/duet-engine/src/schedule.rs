//! Ordered update and render phases.
//!
//! A [`SystemRegistry`] holds two flat lists of boxed systems. Registration
//! order is execution order: there is no dependency inference, no priority
//! and no sorting. Each system stays addressable by its concrete type, so a
//! scene can fetch its physics system to tweak tuning, or tick one system on
//! its own while a menu is open.
//!
//! ```
//! use duet_engine::prelude::*;
//!
//! #[derive(Default)]
//! struct Counter(u32);
//!
//! impl UpdateSystem for Counter {
//!     fn update(&mut self, _ctx: &mut TickContext<'_>) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let mut registry = SystemRegistry::new();
//! registry.add_update(Counter::default());
//! assert_eq!(registry.get_update::<Counter>().map(|c| c.0), Some(0));
//! ```

use std::any::{Any, TypeId};
use std::time::{Duration, Instant};

use duet_ecs::command::CommandBuffer;
use duet_ecs::world::World;
use tracing::trace;

use crate::events::CollisionEventBuffer;

// ---------------------------------------------------------------------------
// AsAny
// ---------------------------------------------------------------------------

/// Downcast support for boxed systems. Implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// `path::to::Type<path::Arg>` -> `Type<path::Arg>`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

// ---------------------------------------------------------------------------
// TickContext
// ---------------------------------------------------------------------------

/// Everything an update system may touch during one fixed tick.
pub struct TickContext<'a> {
    pub world: &'a mut World,
    /// This tick's contacts. Rewritten by the detection pass.
    pub events: &'a mut CollisionEventBuffer,
    /// Structural changes, applied after every update system has run.
    pub commands: &'a mut CommandBuffer,
    /// Fixed timestep in seconds.
    pub dt: f32,
    /// Index of the tick being run, starting at 0.
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// System traits
// ---------------------------------------------------------------------------

/// A system run once per fixed tick, in registration order.
pub trait UpdateSystem: AsAny {
    fn update(&mut self, ctx: &mut TickContext<'_>);

    /// Name used in diagnostics and logs. Defaults to the type name.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }
}

/// A system run once per presented frame, after all updates. Read-only.
pub trait RenderSystem: AsAny {
    fn render(&mut self, world: &World, events: &CollisionEventBuffer);

    fn name(&self) -> &str {
        short_type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// SystemRegistry
// ---------------------------------------------------------------------------

struct Entry<S: ?Sized> {
    type_id: TypeId,
    system: Box<S>,
}

/// Wall-clock time one system took during a phase.
pub type SystemTiming = (String, Duration);

/// Two ordered lists of systems: update phase, then render phase.
#[derive(Default)]
pub struct SystemRegistry {
    update: Vec<Entry<dyn UpdateSystem>>,
    render: Vec<Entry<dyn RenderSystem>>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -- registration -------------------------------------------------------

    /// Append `system` to the update phase. Returns the stored system.
    ///
    /// Several systems of the same type may be registered; type lookups find
    /// the first.
    pub fn add_update<T: UpdateSystem>(&mut self, system: T) -> &mut T {
        self.update.push(Entry {
            type_id: TypeId::of::<T>(),
            system: Box::new(system),
        });
        self.update
            .last_mut()
            .and_then(|entry| (*entry.system).as_any_mut().downcast_mut::<T>())
            .unwrap_or_else(|| unreachable!("just pushed a {}", short_type_name::<T>()))
    }

    /// Append `system` to the render phase. Returns the stored system.
    pub fn add_render<T: RenderSystem>(&mut self, system: T) -> &mut T {
        self.render.push(Entry {
            type_id: TypeId::of::<T>(),
            system: Box::new(system),
        });
        self.render
            .last_mut()
            .and_then(|entry| (*entry.system).as_any_mut().downcast_mut::<T>())
            .unwrap_or_else(|| unreachable!("just pushed a {}", short_type_name::<T>()))
    }

    // -- execution ----------------------------------------------------------

    /// Run every update system once, in order. Returns per-system timings.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> Vec<SystemTiming> {
        let mut timings = Vec::with_capacity(self.update.len());
        for entry in &mut self.update {
            let start = Instant::now();
            entry.system.update(ctx);
            let elapsed = start.elapsed();
            trace!(system = entry.system.name(), tick = ctx.tick, ?elapsed, "update");
            timings.push((entry.system.name().to_owned(), elapsed));
        }
        timings
    }

    /// Run every render system once, in order. Returns per-system timings.
    pub fn render(&mut self, world: &World, events: &CollisionEventBuffer) -> Vec<SystemTiming> {
        let mut timings = Vec::with_capacity(self.render.len());
        for entry in &mut self.render {
            let start = Instant::now();
            entry.system.render(world, events);
            timings.push((entry.system.name().to_owned(), start.elapsed()));
        }
        timings
    }

    /// Run only the first update system of type `T`. Returns whether one was
    /// registered.
    pub fn update_one<T: UpdateSystem>(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let wanted = TypeId::of::<T>();
        match self.update.iter_mut().find(|e| e.type_id == wanted) {
            Some(entry) => {
                entry.system.update(ctx);
                true
            }
            None => false,
        }
    }

    // -- lookup -------------------------------------------------------------

    pub fn get_update<T: UpdateSystem>(&self) -> Option<&T> {
        let wanted = TypeId::of::<T>();
        self.update
            .iter()
            .find(|e| e.type_id == wanted)
            .and_then(|e| (*e.system).as_any().downcast_ref::<T>())
    }

    pub fn get_update_mut<T: UpdateSystem>(&mut self) -> Option<&mut T> {
        let wanted = TypeId::of::<T>();
        self.update
            .iter_mut()
            .find(|e| e.type_id == wanted)
            .and_then(|e| (*e.system).as_any_mut().downcast_mut::<T>())
    }

    pub fn get_render<T: RenderSystem>(&self) -> Option<&T> {
        let wanted = TypeId::of::<T>();
        self.render
            .iter()
            .find(|e| e.type_id == wanted)
            .and_then(|e| (*e.system).as_any().downcast_ref::<T>())
    }

    pub fn get_render_mut<T: RenderSystem>(&mut self) -> Option<&mut T> {
        let wanted = TypeId::of::<T>();
        self.render
            .iter_mut()
            .find(|e| e.type_id == wanted)
            .and_then(|e| (*e.system).as_any_mut().downcast_mut::<T>())
    }

    // -- introspection ------------------------------------------------------

    /// Update system names in execution order.
    pub fn update_names(&self) -> Vec<&str> {
        self.update.iter().map(|e| e.system.name()).collect()
    }

    /// Render system names in execution order.
    pub fn render_names(&self) -> Vec<&str> {
        self.render.iter().map(|e| e.system.name()).collect()
    }

    pub fn update_count(&self) -> usize {
        self.update.len()
    }

    pub fn render_count(&self) -> usize {
        self.render.len()
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("update", &self.update_names())
            .field("render", &self.render_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
