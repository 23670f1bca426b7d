//! # Queries and Capability Bundles
//!
//! - [`ComponentSet`] names the component types a system or filter requires.
//! - [`EntityQuery`] walks the live range in hierarchy order and yields the
//!   entities holding every type in a set.
//! - [`Bundle`] projects one entity into a typed view of several component
//!   references. Tuples of references implement it, and
//!   [`capability_bundle!`](crate::capability_bundle) declares named structs
//!   with an explicit field/type list.
//!
//! Queries borrow the world, so structural mutation cannot happen while one
//! is being iterated. Collect ids first when a pass needs to mutate.

use std::any::TypeId;

use super::component::Component;
use super::entity::EntityId;
use super::store::ComponentStore;
use crate::error::EcsResult;

/// Ordered, duplicate-free set of component types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentSet {
    ids: Vec<TypeId>,
    names: Vec<&'static str>,
}

impl ComponentSet {
    /// Creates an empty set (matches every entity).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set extended with `C`.
    #[must_use]
    pub fn with<C: Component>(mut self) -> Self {
        self.insert::<C>();
        self
    }

    /// Adds `C` to the set. Returns `false` if it was already present.
    pub fn insert<C: Component>(&mut self) -> bool {
        let type_id = TypeId::of::<C>();
        if self.ids.contains(&type_id) {
            return false;
        }
        self.ids.push(type_id);
        self.names.push(C::type_name());
        true
    }

    /// The set required by a bundle.
    #[must_use]
    pub fn of<'w, B: Bundle<'w>>() -> Self {
        B::component_set()
    }

    /// Checks if `C` is in the set.
    #[must_use]
    pub fn contains<C: Component>(&self) -> bool {
        self.ids.contains(&TypeId::of::<C>())
    }

    /// Type ids, in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[TypeId] {
        &self.ids
    }

    /// Type names, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }

    /// Number of types in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Lazy iterator over live entities holding every type of a [`ComponentSet`].
///
/// Yields in hierarchy order (parents before children). Cloning or calling
/// [`restart`](Self::restart) replays the scan from the first live entity.
#[derive(Clone)]
pub struct EntityQuery<'w> {
    live: &'w [EntityId],
    store: &'w ComponentStore,
    types: Vec<TypeId>,
    position: usize,
}

impl<'w> EntityQuery<'w> {
    pub(crate) fn new(live: &'w [EntityId], store: &'w ComponentStore, set: &ComponentSet) -> Self {
        Self {
            live,
            store,
            types: set.ids().to_vec(),
            position: 0,
        }
    }

    /// Rewinds the scan to the first live entity.
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl Iterator for EntityQuery<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entity = *self.live.get(self.position)?;
            self.position += 1;
            if self.store.has_all(&self.types, entity) {
                return Some(entity);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.live.len().saturating_sub(self.position)))
    }
}

/// Typed view of several components of one entity.
pub trait Bundle<'w>: Sized {
    /// Component types the bundle reads.
    fn component_set() -> ComponentSet;

    /// Builds the bundle for an entity.
    ///
    /// # Errors
    ///
    /// Fails with the first component lookup error (unregistered type or
    /// missing component).
    fn fetch(store: &'w ComponentStore, entity: EntityId) -> EcsResult<Self>;
}

macro_rules! impl_tuple_bundle {
    ($($name:ident),+) => {
        impl<'w, $($name: Component),+> Bundle<'w> for ($(&'w $name,)+) {
            fn component_set() -> ComponentSet {
                ComponentSet::new()$(.with::<$name>())+
            }

            fn fetch(store: &'w ComponentStore, entity: EntityId) -> EcsResult<Self> {
                Ok(($(store.get::<$name>(entity)?,)+))
            }
        }
    };
}

impl_tuple_bundle!(A);
impl_tuple_bundle!(A, B);
impl_tuple_bundle!(A, B, C);
impl_tuple_bundle!(A, B, C, D);
impl_tuple_bundle!(A, B, C, D, E);
impl_tuple_bundle!(A, B, C, D, E, F);

/// Declares a named capability bundle.
///
/// Each field lists the component type it borrows; the macro generates the
/// struct with `&'w` fields and its [`Bundle`] impl. No reflection is
/// involved: the field/type pairs are fixed at compile time.
///
/// ```rust,ignore
/// capability_bundle! {
///     /// What the mover system needs.
///     pub struct Mover<'w> {
///         pub pose: Pose,
///         pub velocity: Velocity,
///     }
/// }
///
/// for (entity, mover) in world.query::<Mover>()? {
///     println!("{entity}: {:?}", mover.velocity);
/// }
/// ```
#[macro_export]
macro_rules! capability_bundle {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident<$lt:lifetime> {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $component:ty
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name<$lt> {
            $(
                $(#[$field_meta])*
                $field_vis $field: &$lt $component,
            )+
        }

        impl<$lt> $crate::ecs::Bundle<$lt> for $name<$lt> {
            fn component_set() -> $crate::ecs::ComponentSet {
                $crate::ecs::ComponentSet::new()$(.with::<$component>())+
            }

            fn fetch(
                store: &$lt $crate::ecs::ComponentStore,
                entity: $crate::ecs::EntityId,
            ) -> $crate::EcsResult<Self> {
                Ok(Self {
                    $($field: store.get::<$component>(entity)?,)+
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Pose;
    use crate::error::EcsError;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Speed(f32);

    impl Component for Speed {}

    crate::capability_bundle! {
        /// Test bundle.
        struct Runner<'w> {
            pose: Pose,
            speed: Speed,
        }
    }

    fn store() -> ComponentStore {
        let mut store = ComponentStore::new(8);
        store.register::<Pose>().unwrap();
        store.register::<Speed>().unwrap();
        store
    }

    #[test]
    fn test_component_set_dedup() {
        let mut set = ComponentSet::new().with::<Pose>().with::<Speed>();
        assert!(!set.insert::<Pose>());
        assert_eq!(set.len(), 2);
        assert!(set.contains::<Speed>());
        assert_eq!(set, ComponentSet::of::<Runner>());
    }

    #[test]
    fn test_entity_query_filters_and_restarts() {
        let mut store = store();
        let live: Vec<EntityId> = (0..4).map(EntityId::new).collect();
        for &entity in &live {
            store.add(entity, Pose::default()).unwrap();
        }
        store.add(live[1], Speed(1.0)).unwrap();
        store.add(live[3], Speed(3.0)).unwrap();

        let set = ComponentSet::new().with::<Speed>();
        let mut query = EntityQuery::new(&live, &store, &set);
        let replay = query.clone();
        assert_eq!(query.by_ref().collect::<Vec<_>>(), vec![live[1], live[3]]);
        assert_eq!(query.next(), None);

        query.restart();
        assert_eq!(query.count(), 2);
        assert_eq!(replay.count(), 2);
    }

    #[test]
    fn test_tuple_bundle_fetch() {
        let mut store = store();
        let entity = EntityId::new(2);
        store.add(entity, Pose::new(1.0, 0.0, 0.0)).unwrap();

        assert!(matches!(
            <(&Pose, &Speed)>::fetch(&store, entity),
            Err(EcsError::ComponentNotPresent { .. })
        ));

        store.add(entity, Speed(4.0)).unwrap();
        let (pose, speed) = <(&Pose, &Speed)>::fetch(&store, entity).unwrap();
        assert_eq!(pose.translation[0], 1.0);
        assert_eq!(*speed, Speed(4.0));
    }

    #[test]
    fn test_declared_bundle_fetch() {
        let mut store = store();
        let entity = EntityId::new(5);
        store.add(entity, Pose::default()).unwrap();
        store.add(entity, Speed(2.5)).unwrap();

        let runner = Runner::fetch(&store, entity).unwrap();
        assert_eq!(*runner.speed, Speed(2.5));
        assert_eq!(*runner.pose, Pose::default());
    }
}
