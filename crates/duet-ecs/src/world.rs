//! The [`World`] is the top-level container for the ECS. It owns the entity
//! allocator and one storage per component type.
//!
//! Every other system touches entity state through this API only.

use tracing::trace;

use crate::component::{Component, ComponentRegistry, ComponentStorage};
use crate::entity::{EntityAllocator, EntityId};

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Entity identity plus per-type component storage.
///
/// # Access rules
///
/// - [`get`](Self::get) / [`get_mut`](Self::get_mut) are for components the
///   caller already knows exist. Asking for a missing component is a
///   programmer error and panics.
/// - [`try_get`](Self::try_get) / [`try_get_mut`](Self::try_get_mut) are the
///   recoverable counterparts. Use them whenever the entity id came from
///   another component or an event, since it may have been destroyed since.
#[derive(Debug, Default)]
pub struct World {
    entities: EntityAllocator,
    pub(crate) components: ComponentRegistry,
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            components: ComponentRegistry::new(),
        }
    }

    // -- entities -----------------------------------------------------------

    /// Create a fresh entity with no components.
    pub fn create(&mut self) -> EntityId {
        let entity = self.entities.allocate();
        trace!(%entity, "entity created");
        entity
    }

    /// Destroy an entity, removing it from every component storage.
    ///
    /// Cost is proportional to the number of component types ever used, not to
    /// the number of entities. Destroying an unknown or already destroyed
    /// entity is a no-op. Returns whether anything was destroyed.
    pub fn destroy(&mut self, entity: EntityId) -> bool {
        let was_alive = self.entities.deallocate(entity);
        let removed = self.components.remove_entity(entity);
        if was_alive || removed > 0 {
            trace!(%entity, removed, "entity destroyed");
        }
        was_alive || removed > 0
    }

    /// Whether `entity` was created by this world and not yet destroyed.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    // -- components ---------------------------------------------------------

    /// Attach `value` to `entity`, overwriting any existing `T`.
    ///
    /// The returned reference is valid until the next structural change to
    /// `T`'s storage.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not alive. Defer the add through a
    /// [`CommandBuffer`](crate::command::CommandBuffer) when the target may be
    /// destroyed first.
    #[track_caller]
    pub fn add<T: Component>(&mut self, entity: EntityId, value: T) -> &mut T {
        if !self.is_alive(entity) {
            dead_entity::<T>(entity);
        }
        self.components.storage_or_insert::<T>().insert(entity, value)
    }

    /// Attach `T::default()` to `entity`, overwriting any existing `T`.
    #[track_caller]
    pub fn add_default<T: Component + Default>(&mut self, entity: EntityId) -> &mut T {
        self.add(entity, T::default())
    }

    /// Detach and return `entity`'s `T`. No-op (returns `None`) if absent.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        self.components.storage_mut::<T>()?.remove(entity)
    }

    /// Whether `entity` has a `T`.
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.components
            .storage::<T>()
            .is_some_and(|s| s.contains(entity))
    }

    /// Shared access to a component the caller knows exists.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no `T`. Use [`try_get`](Self::try_get) when
    /// existence is not guaranteed.
    #[track_caller]
    pub fn get<T: Component>(&self, entity: EntityId) -> &T {
        match self.try_get::<T>(entity) {
            Some(value) => value,
            None => missing_component::<T>(entity),
        }
    }

    /// Exclusive access to a component the caller knows exists.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no `T`.
    #[track_caller]
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> &mut T {
        match self.try_get_mut::<T>(entity) {
            Some(value) => value,
            None => missing_component::<T>(entity),
        }
    }

    /// Shared access to `entity`'s `T`, or `None`.
    pub fn try_get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.components.storage::<T>()?.get(entity)
    }

    /// Exclusive access to `entity`'s `T`, or `None`.
    pub fn try_get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.components.storage_mut::<T>()?.get_mut(entity)
    }

    // -- queries ------------------------------------------------------------
    //
    // Multi-component views (`view1` .. `view4`, `view1_mut` .. `view4_mut`)
    // live in the `query` module.

    /// Typed storage for `T`, if any entity has ever had a `T`.
    pub fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.components.storage::<T>()
    }

    /// Number of entities with a `T`.
    pub fn count<T: Component>(&self) -> usize {
        self.components.storage::<T>().map_or(0, |s| s.len())
    }

    /// Entities owning a `T`, in storage order.
    pub fn entities_with<T: Component>(&self) -> Vec<EntityId> {
        self.components
            .storage::<T>()
            .map(|s| s.entities().to_vec())
            .unwrap_or_default()
    }

    /// Type names of every component currently attached to `entity`, sorted.
    pub fn component_names(&self, entity: EntityId) -> Vec<&'static str> {
        self.components.component_names_of(entity)
    }
}

#[cold]
#[track_caller]
fn missing_component<T>(entity: EntityId) -> ! {
    panic!(
        "entity {entity} has no component `{}` (use try_get when existence is not guaranteed)",
        std::any::type_name::<T>()
    )
}

#[cold]
#[track_caller]
fn dead_entity<T>(entity: EntityId) -> ! {
    panic!(
        "cannot add `{}` to dead entity {entity}",
        std::any::type_name::<T>()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
