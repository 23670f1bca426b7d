//! # World Events
//!
//! Observer lists for structural changes. Observers run synchronously, in
//! registration order, at the moment the change happens:
//!
//! | Event               | Fired                                              |
//! |---------------------|----------------------------------------------------|
//! | `entity_created`    | after the entity is allocated, posed and parented  |
//! | `entity_destroyed`  | after its components are removed, before release   |
//! | `component_added`   | after the value is stored                          |
//! | `component_removed` | after the value is taken out of the store          |
//!
//! Component observers receive the value as `&dyn Any`; downcast to the type
//! of interest.

use std::any::Any;
use std::fmt;

use super::entity::EntityId;

/// Observer of entity lifecycle events.
pub type EntityObserver = Box<dyn FnMut(EntityId)>;

/// Observer of component attach/detach events.
pub type ComponentObserver = Box<dyn FnMut(EntityId, &dyn Any)>;

/// Observer lists of a world.
#[derive(Default)]
pub struct WorldEvents {
    entity_created: Vec<EntityObserver>,
    entity_destroyed: Vec<EntityObserver>,
    component_added: Vec<ComponentObserver>,
    component_removed: Vec<ComponentObserver>,
}

impl WorldEvents {
    /// Creates empty observer lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes entity creation.
    pub fn on_entity_created(&mut self, observer: impl FnMut(EntityId) + 'static) {
        self.entity_created.push(Box::new(observer));
    }

    /// Observes entity destruction, including cascaded descendants.
    pub fn on_entity_destroyed(&mut self, observer: impl FnMut(EntityId) + 'static) {
        self.entity_destroyed.push(Box::new(observer));
    }

    /// Observes components being attached.
    pub fn on_component_added(&mut self, observer: impl FnMut(EntityId, &dyn Any) + 'static) {
        self.component_added.push(Box::new(observer));
    }

    /// Observes components being detached.
    pub fn on_component_removed(&mut self, observer: impl FnMut(EntityId, &dyn Any) + 'static) {
        self.component_removed.push(Box::new(observer));
    }

    /// Total number of observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.entity_created.len()
            + self.entity_destroyed.len()
            + self.component_added.len()
            + self.component_removed.len()
    }

    pub(crate) fn entity_created(&mut self, entity: EntityId) {
        for observer in &mut self.entity_created {
            observer(entity);
        }
    }

    pub(crate) fn entity_destroyed(&mut self, entity: EntityId) {
        for observer in &mut self.entity_destroyed {
            observer(entity);
        }
    }

    pub(crate) fn component_added(&mut self, entity: EntityId, component: &dyn Any) {
        for observer in &mut self.component_added {
            observer(entity, component);
        }
    }

    pub(crate) fn component_removed(&mut self, entity: EntityId, component: &dyn Any) {
        for observer in &mut self.component_removed {
            observer(entity, component);
        }
    }
}

impl fmt::Debug for WorldEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldEvents")
            .field("entity_created", &self.entity_created.len())
            .field("entity_destroyed", &self.entity_destroyed.len())
            .field("component_added", &self.component_added.len())
            .field("component_removed", &self.component_removed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_observers_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut events = WorldEvents::new();

        let first = Rc::clone(&log);
        events.on_entity_created(move |entity| first.borrow_mut().push((1, entity)));
        let second = Rc::clone(&log);
        events.on_entity_created(move |entity| second.borrow_mut().push((2, entity)));

        events.entity_created(EntityId::new(7));
        assert_eq!(
            *log.borrow(),
            vec![(1, EntityId::new(7)), (2, EntityId::new(7))]
        );
        assert_eq!(events.observer_count(), 2);
    }

    #[test]
    fn test_component_observer_downcasts() {
        let seen = Rc::new(RefCell::new(None));
        let mut events = WorldEvents::new();

        let sink = Rc::clone(&seen);
        events.on_component_removed(move |_, component| {
            *sink.borrow_mut() = component.downcast_ref::<u64>().copied();
        });

        events.component_added(EntityId::new(1), &5_u64);
        assert_eq!(*seen.borrow(), None);

        events.component_removed(EntityId::new(1), &9_u64);
        assert_eq!(*seen.borrow(), Some(9));
    }
}
