//! Component storage and the type-keyed storage registry.
//!
//! Every component type `T` gets exactly one [`ComponentStorage<T>`], created
//! lazily the first time `T` is added to any entity. The [`ComponentRegistry`]
//! keeps those storages behind a type-erased [`AnyStorage`] handle keyed by
//! `TypeId`, and layers typed accessors on top.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Marker trait for anything that can be stored as a component.
///
/// Blanket-implemented for every `Send + Sync + 'static` type, so plain data
/// structs and zero-sized tag structs need no extra boilerplate.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

// ---------------------------------------------------------------------------
// ComponentStorage
// ---------------------------------------------------------------------------

/// Dense storage for one component type.
///
/// Values live in a packed `Vec` alongside the owning entity ids; a hash index
/// maps `EntityId -> slot`. Removal swaps the last slot into the hole, so
/// iteration order is insertion order until the first removal and unspecified
/// afterwards.
pub struct ComponentStorage<T> {
    entities: Vec<EntityId>,
    values: Vec<T>,
    index: HashMap<EntityId, usize>,
}

impl<T: Component> ComponentStorage<T> {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            values: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert or overwrite the component for `entity`. Returns the stored value.
    pub fn insert(&mut self, entity: EntityId, value: T) -> &mut T {
        let slot = match self.index.get(&entity) {
            Some(&slot) => {
                self.values[slot] = value;
                slot
            }
            None => {
                let slot = self.values.len();
                self.entities.push(entity);
                self.values.push(value);
                self.index.insert(entity, slot);
                slot
            }
        };
        &mut self.values[slot]
    }

    /// Remove and return the component for `entity`, if present.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let slot = self.index.remove(&entity)?;
        self.entities.swap_remove(slot);
        let value = self.values.swap_remove(slot);
        if let Some(&moved) = self.entities.get(slot) {
            self.index.insert(moved, slot);
        }
        Some(value)
    }

    /// Shared access to `entity`'s component.
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.index.get(&entity).map(|&slot| &self.values[slot])
    }

    /// Exclusive access to `entity`'s component.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        match self.index.get(&entity) {
            Some(&slot) => Some(&mut self.values[slot]),
            None => None,
        }
    }

    /// Whether `entity` has a component in this storage.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.index.contains_key(&entity)
    }

    /// Number of stored components.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entities owning this component, in storage order.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Iterate `(entity, &value)` in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.entities.iter().copied().zip(self.values.iter())
    }

    /// Iterate `(entity, &mut value)` in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> + '_ {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }
}

impl<T: Component> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ComponentStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStorage")
            .field("type", &std::any::type_name::<T>())
            .field("len", &self.values.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AnyStorage -- type-erased storage handle
// ---------------------------------------------------------------------------

/// Type-erased view of a [`ComponentStorage<T>`].
///
/// Lets the registry remove an entity from every storage without knowing the
/// concrete component types, and lets typed accessors downcast back.
pub trait AnyStorage: Send + Sync {
    /// Remove `entity`'s component, if any. Returns whether one was removed.
    fn remove_entity(&mut self, entity: EntityId) -> bool;
    /// Whether `entity` has a component in this storage.
    fn contains_entity(&self, entity: EntityId) -> bool;
    /// Number of stored components.
    fn len(&self) -> usize;
    /// Rust type name of the stored component.
    fn component_name(&self) -> &'static str;
    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
    /// Downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyStorage for ComponentStorage<T> {
    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }

    fn contains_entity(&self, entity: EntityId) -> bool {
        self.contains(entity)
    }

    fn len(&self) -> usize {
        ComponentStorage::len(self)
    }

    fn component_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Owns one storage per component type, keyed by `TypeId`.
///
/// Storages are created on first use and are never dropped for the lifetime
/// of the registry (an empty storage is kept around).
#[derive(Default)]
pub struct ComponentRegistry {
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            storages: HashMap::new(),
        }
    }

    /// Typed shared access to `T`'s storage, if it has been created.
    pub fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<ComponentStorage<T>>())
    }

    /// Typed exclusive access to `T`'s storage, if it has been created.
    pub fn storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<ComponentStorage<T>>())
    }

    /// Typed exclusive access to `T`'s storage, creating it on first use.
    pub fn storage_or_insert<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        self.storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStorage::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
            .unwrap_or_else(|| unreachable!("storage keyed by TypeId holds a different type"))
    }

    /// Every storage with its key, as disjoint exclusive borrows.
    ///
    /// Mutable views walk this once to pick out several typed storages at the
    /// same time without aliasing.
    pub(crate) fn storages_mut(
        &mut self,
    ) -> impl Iterator<Item = (TypeId, &mut Box<dyn AnyStorage>)> + '_ {
        self.storages
            .iter_mut()
            .map(|(type_id, storage)| (*type_id, storage))
    }

    /// Remove `entity` from every storage. Returns how many components were dropped.
    pub fn remove_entity(&mut self, entity: EntityId) -> usize {
        self.storages
            .values_mut()
            .map(|s| s.remove_entity(entity))
            .filter(|&removed| removed)
            .count()
    }

    /// Number of component types that have a storage.
    pub fn len(&self) -> usize {
        self.storages.len()
    }

    /// Whether no storage has been created yet.
    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }

    /// Type names of all component types that own `entity`, sorted.
    pub fn component_names_of(&self, entity: EntityId) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .storages
            .values()
            .filter(|s| s.contains_entity(entity))
            .map(|s| s.component_name())
            .collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<(&'static str, usize)> = self
            .storages
            .values()
            .map(|s| (s.component_name(), s.len()))
            .collect();
        entries.sort_unstable();
        f.debug_map().entries(entries).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
