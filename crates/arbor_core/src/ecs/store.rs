//! # Component Store
//!
//! Type-indexed registry of component storages.
//!
//! ```text
//! storages: HashMap<TypeId, Box<dyn ErasedStorage>>
//!   key   = component TypeId (registered once at startup)
//!   value = ComponentStorage<C>, one slot per entity id
//! order:   registration order, used for whole-entity sweeps
//! ```
//!
//! Typed access resolves the storage by `TypeId` and downcasts once; the
//! component values themselves are never boxed.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::Component;
use super::entity::EntityId;
use super::storage::{ComponentStorage, ErasedStorage};
use crate::error::{EcsError, EcsResult};

/// Owner of every component value in a world.
pub struct ComponentStore {
    capacity: usize,
    storages: HashMap<TypeId, Box<dyn ErasedStorage>>,
    order: Vec<TypeId>,
}

impl ComponentStore {
    /// Creates an empty store for `capacity` entity ids.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            storages: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registers a component type.
    ///
    /// # Errors
    ///
    /// `ComponentTypeAlreadyRegistered` if the type is already known.
    pub fn register<C: Component>(&mut self) -> EcsResult<()> {
        let type_id = TypeId::of::<C>();
        if self.storages.contains_key(&type_id) {
            return Err(EcsError::ComponentTypeAlreadyRegistered(C::type_name()));
        }
        self.storages
            .insert(type_id, Box::new(ComponentStorage::<C>::new(self.capacity)));
        self.order.push(type_id);
        Ok(())
    }

    /// Checks if a component type is registered.
    #[must_use]
    pub fn is_registered<C: Component>(&self) -> bool {
        self.storages.contains_key(&TypeId::of::<C>())
    }

    /// Checks if a component type id is registered.
    #[must_use]
    pub fn is_registered_id(&self, type_id: TypeId) -> bool {
        self.storages.contains_key(&type_id)
    }

    /// Number of registered component types.
    #[must_use]
    pub fn registered_types(&self) -> usize {
        self.order.len()
    }

    /// Typed storage of a registered component type.
    ///
    /// # Errors
    ///
    /// `ComponentTypeNotRegistered` if the type was never registered.
    pub fn storage<C: Component>(&self) -> EcsResult<&ComponentStorage<C>> {
        self.storages
            .get(&TypeId::of::<C>())
            .and_then(|storage| storage.as_any().downcast_ref::<ComponentStorage<C>>())
            .ok_or(EcsError::ComponentTypeNotRegistered(C::type_name()))
    }

    /// Typed storage of a registered component type, mutably.
    ///
    /// # Errors
    ///
    /// `ComponentTypeNotRegistered` if the type was never registered.
    pub fn storage_mut<C: Component>(&mut self) -> EcsResult<&mut ComponentStorage<C>> {
        self.storages
            .get_mut(&TypeId::of::<C>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<ComponentStorage<C>>())
            .ok_or(EcsError::ComponentTypeNotRegistered(C::type_name()))
    }

    /// Attaches a component and returns a reference to the stored value.
    ///
    /// # Errors
    ///
    /// - `ComponentTypeNotRegistered` if the type was never registered
    /// - `EntityNotFound` if the id lies outside the store
    /// - `ComponentAlreadyPresent` if the entity already has one
    pub fn add<C: Component>(&mut self, entity: EntityId, component: C) -> EcsResult<&C> {
        if entity.slot() >= self.capacity {
            return Err(EcsError::EntityNotFound(entity));
        }
        let storage = self.storage_mut::<C>()?;
        if storage.contains(entity) {
            return Err(EcsError::ComponentAlreadyPresent {
                entity,
                component: C::type_name(),
            });
        }
        storage.insert(entity, component);
        storage
            .get(entity)
            .ok_or(EcsError::ComponentNotPresent {
                entity,
                component: C::type_name(),
            })
    }

    /// Detaches a component and returns it.
    ///
    /// # Errors
    ///
    /// - `ComponentTypeNotRegistered` if the type was never registered
    /// - `ComponentNotPresent` if the entity has none
    pub fn remove<C: Component>(&mut self, entity: EntityId) -> EcsResult<C> {
        self.storage_mut::<C>()?
            .remove(entity)
            .ok_or(EcsError::ComponentNotPresent {
                entity,
                component: C::type_name(),
            })
    }

    /// Detaches a component only if it still equals `expected`.
    ///
    /// # Errors
    ///
    /// As [`remove`](Self::remove), plus `ComponentValueConflict` when the
    /// current value differs from `expected` (the component is kept).
    pub fn remove_matching<C>(&mut self, entity: EntityId, expected: &C) -> EcsResult<C>
    where
        C: Component + PartialEq,
    {
        let current = self.get::<C>(entity)?;
        if current != expected {
            return Err(EcsError::ComponentValueConflict {
                entity,
                component: C::type_name(),
            });
        }
        self.remove::<C>(entity)
    }

    /// Checks if an entity has a component. Unregistered types are never present.
    #[must_use]
    pub fn has<C: Component>(&self, entity: EntityId) -> bool {
        self.storage::<C>()
            .map_or(false, |storage| storage.contains(entity))
    }

    /// Checks if an entity has a component of the given type id.
    #[must_use]
    pub fn has_id(&self, type_id: TypeId, entity: EntityId) -> bool {
        self.storages
            .get(&type_id)
            .map_or(false, |storage| storage.contains_erased(entity))
    }

    /// Checks if an entity has every listed component type.
    #[must_use]
    pub fn has_all(&self, types: &[TypeId], entity: EntityId) -> bool {
        types.iter().all(|&type_id| self.has_id(type_id, entity))
    }

    /// Gets an entity's component.
    ///
    /// # Errors
    ///
    /// - `ComponentTypeNotRegistered` if the type was never registered
    /// - `ComponentNotPresent` if the entity has none
    pub fn get<C: Component>(&self, entity: EntityId) -> EcsResult<&C> {
        self.storage::<C>()?
            .get(entity)
            .ok_or(EcsError::ComponentNotPresent {
                entity,
                component: C::type_name(),
            })
    }

    /// Gets an entity's component mutably.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_mut<C: Component>(&mut self, entity: EntityId) -> EcsResult<&mut C> {
        self.storage_mut::<C>()?
            .get_mut(entity)
            .ok_or(EcsError::ComponentNotPresent {
                entity,
                component: C::type_name(),
            })
    }

    /// Gets an entity's component, or `None` for any failure.
    #[must_use]
    pub fn try_get<C: Component>(&self, entity: EntityId) -> Option<&C> {
        self.storage::<C>().ok()?.get(entity)
    }

    /// Projects each entity onto its component, preserving input order.
    ///
    /// Each item fails independently; collect into `EcsResult<Vec<_>>` to
    /// stop at the first entity missing the component.
    pub fn components_of<'s, C, I>(
        &'s self,
        entities: I,
    ) -> impl Iterator<Item = EcsResult<&'s C>> + 's
    where
        C: Component,
        I: IntoIterator<Item = EntityId>,
        I::IntoIter: 's,
    {
        entities.into_iter().map(move |entity| self.get::<C>(entity))
    }

    /// Removes every component an entity holds, in registration order.
    pub(crate) fn remove_all<F>(&mut self, entity: EntityId, mut on_removed: F)
    where
        F: FnMut(&'static str, Box<dyn Any>),
    {
        for type_id in &self.order {
            if let Some(storage) = self.storages.get_mut(type_id) {
                if let Some(component) = storage.remove_erased(entity) {
                    on_removed(storage.component_name(), component);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Pose;

    #[derive(Clone, Debug, PartialEq)]
    struct Health(u32);

    impl Component for Health {}

    fn store() -> ComponentStore {
        let mut store = ComponentStore::new(8);
        store.register::<Pose>().unwrap();
        store.register::<Health>().unwrap();
        store
    }

    #[test]
    fn test_double_registration_fails() {
        let mut store = store();
        assert!(matches!(
            store.register::<Health>(),
            Err(EcsError::ComponentTypeAlreadyRegistered(_))
        ));
        assert_eq!(store.registered_types(), 2);
    }

    #[test]
    fn test_unregistered_type() {
        #[derive(Debug)]
        struct Unknown;
        impl Component for Unknown {}

        let mut store = store();
        let entity = EntityId::new(1);
        assert!(matches!(
            store.add(entity, Unknown),
            Err(EcsError::ComponentTypeNotRegistered(_))
        ));
        assert!(!store.has::<Unknown>(entity));
        assert!(store.try_get::<Unknown>(entity).is_none());
    }

    #[test]
    fn test_add_twice_fails() {
        let mut store = store();
        let entity = EntityId::new(3);
        store.add(entity, Health(10)).unwrap();
        assert!(matches!(
            store.add(entity, Health(20)),
            Err(EcsError::ComponentAlreadyPresent { .. })
        ));
        assert_eq!(store.get::<Health>(entity), Ok(&Health(10)));
    }

    #[test]
    fn test_remove_matching() {
        let mut store = store();
        let entity = EntityId::new(3);
        store.add(entity, Health(10)).unwrap();

        assert!(matches!(
            store.remove_matching(entity, &Health(11)),
            Err(EcsError::ComponentValueConflict { .. })
        ));
        assert!(store.has::<Health>(entity));
        assert_eq!(store.remove_matching(entity, &Health(10)), Ok(Health(10)));
        assert!(matches!(
            store.remove::<Health>(entity),
            Err(EcsError::ComponentNotPresent { .. })
        ));
    }

    #[test]
    fn test_has_all() {
        let mut store = store();
        let entity = EntityId::new(2);
        store.add(entity, Pose::default()).unwrap();
        let both = [TypeId::of::<Pose>(), TypeId::of::<Health>()];

        assert!(!store.has_all(&both, entity));
        store.add(entity, Health(1)).unwrap();
        assert!(store.has_all(&both, entity));
        assert!(store.has_all(&[], entity));
    }

    #[test]
    fn test_components_of_preserves_order() {
        let mut store = store();
        for raw in [4, 1, 6] {
            store.add(EntityId::new(raw), Health(raw * 10)).unwrap();
        }
        let values: Vec<u32> = store
            .components_of::<Health, _>([6, 1, 4].map(EntityId::new))
            .map(|health| health.map(|h| h.0))
            .collect::<EcsResult<_>>()
            .unwrap();
        assert_eq!(values, vec![60, 10, 40]);

        let missing: EcsResult<Vec<&Health>> = store
            .components_of::<Health, _>([EntityId::new(2)])
            .collect();
        assert!(missing.is_err());
    }

    #[test]
    fn test_remove_all_in_registration_order() {
        let mut store = store();
        let entity = EntityId::new(5);
        store.add(entity, Health(3)).unwrap();
        store.add(entity, Pose::default()).unwrap();

        let mut removed = Vec::new();
        store.remove_all(entity, |name, component| {
            removed.push((name, component.is::<Health>()));
        });
        assert_eq!(removed.len(), 2);
        assert!(removed[0].0.ends_with("Pose"));
        assert!(removed[1].1);
        assert!(!store.has::<Pose>(entity));
    }
}
