//! # ECS World
//!
//! The container tying the registry, the component store, the system
//! pipeline and the observer lists together.
//!
//! ```text
//! World
//! ├─ EntityRegistry   dense ids in hierarchy order + parent links
//! ├─ ComponentStore   TypeId → ComponentStorage<C>
//! ├─ SystemPipeline   update list, draw list
//! └─ WorldEvents      created / destroyed / added / removed observers
//! ```
//!
//! All storage is pre-allocated at construction. The root entity (id 0) is
//! created with the world and lives as long as it.

use tracing::{debug, info};

use super::component::{Component, Pose};
use super::entity::EntityId;
use super::events::WorldEvents;
use super::query::{Bundle, ComponentSet, EntityQuery};
use super::registry::{Ancestors, EntityRegistry};
use super::store::ComponentStore;
use super::system::{self, FrameTime, Phase, PoseSync, System, SystemPipeline};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// The ECS World.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new(1024);
/// world.register_component::<Health>()?;
///
/// let ship = world.create_entity()?;
/// let turret = world.create_child(ship)?;
/// world.add_component(turret, Health(40))?;
///
/// world.tick(&FrameTime::default())?;
/// ```
pub struct World {
    registry: EntityRegistry,
    store: ComponentStore,
    pipeline: SystemPipeline,
    events: WorldEvents,
    config: WorldConfig,
}

impl World {
    /// Creates a world with the default configuration and `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            capacity <= u32::MAX as usize,
            "Capacity cannot exceed u32::MAX"
        );
        match Self::with_config(WorldConfig::with_capacity(capacity)) {
            Ok(world) => world,
            Err(err) => panic!("World construction failed: {err}"),
        }
    }

    /// Creates a world from a configuration.
    ///
    /// Registers [`Pose`], creates the root entity and, unless disabled,
    /// registers the [`PoseSync`] draw system.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration does not validate.
    pub fn with_config(config: WorldConfig) -> EcsResult<Self> {
        config.validate()?;

        let mut registry = EntityRegistry::new(config.capacity);
        let mut store = ComponentStore::new(config.capacity);
        store.register::<Pose>()?;

        let root = registry.allocate()?;
        debug_assert!(root.is_root());
        store.add(root, Pose::IDENTITY)?;

        let mut pipeline = SystemPipeline::new();
        if config.pose_sync {
            pipeline.add(Phase::Draw, Box::new(PoseSync))?;
        }

        info!(
            capacity = config.capacity,
            pose_sync = config.pose_sync,
            "world created"
        );

        Ok(Self {
            registry,
            store,
            pipeline,
            events: WorldEvents::new(),
            config,
        })
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Maximum number of live entities, root included.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.registry.capacity()
    }

    /// Number of live entities, root included.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    /// Checks if an entity is live.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.registry.contains(entity)
    }

    /// The entity registry, read-only.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// The component store, read-only.
    #[must_use]
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// The system pipeline, read-only.
    #[must_use]
    pub fn pipeline(&self) -> &SystemPipeline {
        &self.pipeline
    }

    /// Observer lists, for registering hooks.
    pub fn events_mut(&mut self) -> &mut WorldEvents {
        &mut self.events
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity under the root.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` if every slot is live.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        self.create_child(EntityId::ROOT)
    }

    /// Creates an entity under `parent` (`EntityId::NULL` for none).
    ///
    /// The entity receives a default [`Pose`] before it is parented.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if `parent` is not live (no slot is consumed)
    /// - `CapacityExceeded` if every slot is live
    pub fn create_child(&mut self, parent: EntityId) -> EcsResult<EntityId> {
        if !parent.is_null() && !self.registry.contains(parent) {
            return Err(EcsError::EntityNotFound(parent));
        }

        let entity = self.registry.allocate()?;
        let pose = self.store.add(entity, Pose::IDENTITY)?;
        self.events.component_added(entity, pose);
        self.registry.set_parent(entity, parent)?;

        if self.config.log_entity_events {
            debug!(%entity, %parent, "entity created");
        }
        self.events.entity_created(entity);
        Ok(entity)
    }

    /// Destroys an entity and all of its descendants.
    ///
    /// Every destroyed entity loses all of its components (each removal is
    /// observed) and then fires `entity_destroyed`. The dense array is
    /// compacted after each release.
    ///
    /// # Errors
    ///
    /// `EntityNotFound` if the entity is not live.
    ///
    /// # Panics
    ///
    /// Panics if asked to destroy the root.
    pub fn destroy_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        let Self {
            registry,
            store,
            events,
            config,
            ..
        } = self;
        let log = config.log_entity_events;

        registry.destroy(entity, |released| {
            store.remove_all(released, |_, component| {
                events.component_removed(released, &*component);
            });
            if log {
                debug!(entity = %released, "entity destroyed");
            }
            events.entity_destroyed(released);
        })
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Parent of a live entity (`EntityId::NULL` if it has none).
    ///
    /// # Errors
    ///
    /// `EntityNotFound` if the entity is not live.
    pub fn parent(&self, entity: EntityId) -> EcsResult<EntityId> {
        self.registry.parent(entity)
    }

    /// Parent of an entity, `None` if it has none or is not live.
    #[must_use]
    pub fn try_parent(&self, entity: EntityId) -> Option<EntityId> {
        self.registry.try_parent(entity)
    }

    /// Checks if a live entity has a parent.
    #[must_use]
    pub fn has_parent(&self, entity: EntityId) -> bool {
        self.registry.has_parent(entity)
    }

    /// Re-links an entity under a new parent; `EntityId::NULL` clears it.
    ///
    /// Returns `false` when nothing changed.
    ///
    /// # Errors
    ///
    /// `EntityNotFound`, `SelfParent` or `AncestorCycle`; nothing is mutated
    /// on failure.
    pub fn set_parent(&mut self, entity: EntityId, parent: EntityId) -> EcsResult<bool> {
        let changed = self.registry.set_parent(entity, parent)?;
        if changed && self.config.log_entity_events {
            debug!(%entity, %parent, "entity reparented");
        }
        Ok(changed)
    }

    /// Re-links an entity directly under the root.
    ///
    /// # Errors
    ///
    /// See [`set_parent`](Self::set_parent).
    pub fn parent_to_root(&mut self, entity: EntityId) -> EcsResult<bool> {
        self.set_parent(entity, EntityId::ROOT)
    }

    /// Clears an entity's parent link.
    ///
    /// # Errors
    ///
    /// `EntityNotFound` if the entity is not live.
    pub fn unparent(&mut self, entity: EntityId) -> EcsResult<bool> {
        self.set_parent(entity, EntityId::NULL)
    }

    /// Direct children of an entity, in hierarchy order.
    pub fn children(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.registry.children(entity)
    }

    /// Ancestors of an entity, nearest first.
    #[must_use]
    pub fn ancestors(&self, entity: EntityId) -> Ancestors<'_> {
        self.registry.ancestors(entity)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers a component type.
    ///
    /// # Errors
    ///
    /// `ComponentTypeAlreadyRegistered` on a second registration.
    pub fn register_component<C: Component>(&mut self) -> EcsResult<()> {
        self.store.register::<C>()?;
        debug!(component = C::type_name(), "component registered");
        Ok(())
    }

    /// Attaches a component to a live entity.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if the entity is not live
    /// - `ComponentTypeNotRegistered` if the type was never registered
    /// - `ComponentAlreadyPresent` if the entity already has one
    pub fn add_component<C: Component>(&mut self, entity: EntityId, component: C) -> EcsResult<()> {
        self.require_alive(entity)?;
        let stored = self.store.add(entity, component)?;
        self.events.component_added(entity, stored);
        if self.config.log_entity_events {
            debug!(%entity, component = C::type_name(), "component added");
        }
        Ok(())
    }

    /// Detaches a component and returns it.
    ///
    /// # Errors
    ///
    /// `EntityNotFound`, `ComponentTypeNotRegistered` or `ComponentNotPresent`.
    pub fn remove_component<C: Component>(&mut self, entity: EntityId) -> EcsResult<C> {
        self.require_alive(entity)?;
        let removed = self.store.remove::<C>(entity)?;
        self.removed(entity, &removed);
        Ok(removed)
    }

    /// Detaches a component only if it still equals `expected`.
    ///
    /// # Errors
    ///
    /// As [`remove_component`](Self::remove_component), plus
    /// `ComponentValueConflict` when the stored value differs (it is kept).
    pub fn remove_component_matching<C>(&mut self, entity: EntityId, expected: &C) -> EcsResult<C>
    where
        C: Component + PartialEq,
    {
        self.require_alive(entity)?;
        let removed = self.store.remove_matching(entity, expected)?;
        self.removed(entity, &removed);
        Ok(removed)
    }

    fn removed<C: Component>(&mut self, entity: EntityId, component: &C) {
        self.events.component_removed(entity, component);
        if self.config.log_entity_events {
            debug!(%entity, component = C::type_name(), "component removed");
        }
    }

    /// Checks if an entity has a component.
    #[must_use]
    pub fn has_component<C: Component>(&self, entity: EntityId) -> bool {
        self.store.has::<C>(entity)
    }

    /// Checks if a live entity has every component of a set.
    #[must_use]
    pub fn has_components(&self, entity: EntityId, set: &ComponentSet) -> bool {
        self.registry.contains(entity) && self.store.has_all(set.ids(), entity)
    }

    /// Gets an entity's component.
    ///
    /// # Errors
    ///
    /// `ComponentTypeNotRegistered` or `ComponentNotPresent`.
    pub fn get_component<C: Component>(&self, entity: EntityId) -> EcsResult<&C> {
        self.store.get(entity)
    }

    /// Gets an entity's component mutably.
    ///
    /// # Errors
    ///
    /// `ComponentTypeNotRegistered` or `ComponentNotPresent`.
    pub fn get_component_mut<C: Component>(&mut self, entity: EntityId) -> EcsResult<&mut C> {
        self.store.get_mut(entity)
    }

    /// Gets an entity's component, or `None`.
    #[must_use]
    pub fn try_get_component<C: Component>(&self, entity: EntityId) -> Option<&C> {
        self.store.try_get(entity)
    }

    /// Projects each entity onto its component, preserving input order.
    pub fn components_of<'w, C, I>(&'w self, entities: I) -> impl Iterator<Item = EcsResult<&'w C>> + 'w
    where
        C: Component,
        I: IntoIterator<Item = EntityId>,
        I::IntoIter: 'w,
    {
        self.store.components_of(entities)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Live entities holding every component of `set`, in hierarchy order.
    ///
    /// # Errors
    ///
    /// `ComponentTypeNotRegistered` naming the first unknown type.
    pub fn entities(&self, set: &ComponentSet) -> EcsResult<EntityQuery<'_>> {
        if let Some(name) = set
            .ids()
            .iter()
            .zip(set.names())
            .find_map(|(&type_id, name)| (!self.store.is_registered_id(type_id)).then_some(name))
        {
            return Err(EcsError::ComponentTypeNotRegistered(name));
        }
        Ok(EntityQuery::new(self.registry.live(), &self.store, set))
    }

    /// Collects the matches of [`entities`](Self::entities), so the world can
    /// be mutated while walking them.
    ///
    /// # Errors
    ///
    /// See [`entities`](Self::entities).
    pub fn collect_entities(&self, set: &ComponentSet) -> EcsResult<Vec<EntityId>> {
        Ok(self.entities(set)?.collect())
    }

    /// Every live entity matching a bundle, paired with its bundle.
    ///
    /// # Errors
    ///
    /// `ComponentTypeNotRegistered` if the bundle names an unknown type.
    pub fn query<'w, B>(&'w self) -> EcsResult<impl Iterator<Item = (EntityId, B)> + 'w>
    where
        B: Bundle<'w> + 'w,
    {
        let store = &self.store;
        let matches = self.entities(&B::component_set())?;
        Ok(matches.filter_map(move |entity| B::fetch(store, entity).ok().map(|bundle| (entity, bundle))))
    }

    /// Builds a bundle for one entity.
    ///
    /// # Errors
    ///
    /// The first failing component lookup.
    pub fn fetch<'w, B: Bundle<'w>>(&'w self, entity: EntityId) -> EcsResult<B> {
        B::fetch(&self.store, entity)
    }

    /// Builds a bundle for each entity, preserving input order.
    pub fn fetch_all<'w, B, I>(&'w self, entities: I) -> impl Iterator<Item = EcsResult<B>> + 'w
    where
        B: Bundle<'w> + 'w,
        I: IntoIterator<Item = EntityId>,
        I::IntoIter: 'w,
    {
        let store = &self.store;
        entities.into_iter().map(move |entity| B::fetch(store, entity))
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Appends a system to a phase.
    ///
    /// # Errors
    ///
    /// `SystemAlreadyRegistered` if the phase already has a system with the
    /// same name.
    pub fn add_system(&mut self, phase: Phase, system: impl System + 'static) -> EcsResult<()> {
        let system: Box<dyn System> = Box::new(system);
        let name = system.name().to_owned();
        self.pipeline.add(phase, system)?;
        debug!(system = %name, %phase, "system registered");
        Ok(())
    }

    /// Runs every update system once.
    ///
    /// # Errors
    ///
    /// The first system error; later update systems do not run.
    pub fn update(&mut self, time: &FrameTime) -> EcsResult<()> {
        self.run_phase(Phase::Update, time)
    }

    /// Runs every draw system once.
    ///
    /// # Errors
    ///
    /// The first system error; later draw systems do not run.
    pub fn draw(&mut self, time: &FrameTime) -> EcsResult<()> {
        self.run_phase(Phase::Draw, time)
    }

    /// Runs the update phase, then the draw phase.
    ///
    /// # Errors
    ///
    /// The first system error. A failed update skips the draw phase.
    pub fn tick(&mut self, time: &FrameTime) -> EcsResult<()> {
        self.update(time)?;
        self.draw(time)
    }

    fn run_phase(&mut self, phase: Phase, time: &FrameTime) -> EcsResult<()> {
        let mut systems = self.pipeline.take(phase);
        let result = systems
            .iter_mut()
            .try_for_each(|system| system.process(self, time));
        self.pipeline.restore(phase, systems);
        result
    }

    /// Recomputes every world-space [`Pose`] from the local ones.
    pub fn sync_poses(&mut self) {
        system::sync_poses(&self.registry, &mut self.store);
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Verifies the registry invariants and that the root is live and unparented.
    ///
    /// # Errors
    ///
    /// `InvariantViolated` describing the first problem found.
    pub fn validate(&self) -> EcsResult<()> {
        self.registry.validate()?;
        if !self.registry.contains(EntityId::ROOT) {
            return Err(EcsError::InvariantViolated(
                "root entity is not live".to_owned(),
            ));
        }
        if self.registry.try_parent(EntityId::ROOT).is_some() {
            return Err(EcsError::InvariantViolated(
                "root entity has a parent".to_owned(),
            ));
        }
        Ok(())
    }

    fn require_alive(&self, entity: EntityId) -> EcsResult<()> {
        if self.registry.contains(entity) {
            Ok(())
        } else {
            Err(EcsError::EntityNotFound(entity))
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("capacity", &self.capacity())
            .field("entity_count", &self.entity_count())
            .field("component_types", &self.store.registered_types())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
