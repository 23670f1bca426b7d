//! # Component Storage
//!
//! Pre-allocated storage for one component type, keyed by entity id.
//!
//! - All slots are pre-allocated at registration
//! - Access is O(1) via entity id
//! - Slots are keyed by id, not by dense index, so hierarchy reordering
//!   never moves component data

use std::any::Any;

use super::component::Component;
use super::entity::EntityId;

/// Pre-allocated storage for a single component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut storage: ComponentStorage<Pose> = ComponentStorage::new(1024);
/// storage.insert(EntityId::new(3), Pose::new(1.0, 2.0, 3.0));
/// ```
pub struct ComponentStorage<C: Component> {
    /// One slot per entity id.
    slots: Box<[Option<C>]>,
    /// Number of occupied slots.
    len: usize,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates empty storage for `capacity` entity ids.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        let slots: Box<[Option<C>]> = (0..capacity).map(|_| None).collect();
        Self { slots, len: 0 }
    }

    /// Returns the capacity of this storage.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of stored components.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no component is stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Checks if an entity has a component in this storage.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.get(entity).is_some()
    }

    /// Gets the component of an entity.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&C> {
        self.slots.get(entity.slot())?.as_ref()
    }

    /// Gets the component of an entity mutably.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut C> {
        self.slots.get_mut(entity.slot())?.as_mut()
    }

    /// Stores a component, returning the one it replaced.
    ///
    /// # Panics
    ///
    /// Panics if the entity id lies outside the storage.
    pub fn insert(&mut self, entity: EntityId, component: C) -> Option<C> {
        let previous = self.slots[entity.slot()].replace(component);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Takes the component of an entity out of the storage.
    pub fn remove(&mut self, entity: EntityId) -> Option<C> {
        let removed = self.slots.get_mut(entity.slot())?.take();
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Iterates over all stored components with their entity ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.slots.iter().enumerate().filter_map(|(slot, component)| {
            #[allow(clippy::cast_possible_truncation)]
            let entity = EntityId::new(slot as u32);
            component.as_ref().map(|c| (entity, c))
        })
    }
}

/// Type-erased view of a [`ComponentStorage`].
///
/// Only structural operations that must reach every storage (entity
/// destruction) go through this trait; typed access downcasts once.
pub(crate) trait ErasedStorage {
    /// Checks if an entity has a component in this storage.
    fn contains_erased(&self, entity: EntityId) -> bool;

    /// Removes an entity's component, boxed for notification.
    fn remove_erased(&mut self, entity: EntityId) -> Option<Box<dyn Any>>;

    /// Component type name.
    fn component_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedStorage for ComponentStorage<C> {
    fn contains_erased(&self, entity: EntityId) -> bool {
        self.contains(entity)
    }

    fn remove_erased(&mut self, entity: EntityId) -> Option<Box<dyn Any>> {
        self.remove(entity).map(|component| Box::new(component) as Box<dyn Any>)
    }

    fn component_name(&self) -> &'static str {
        C::type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
