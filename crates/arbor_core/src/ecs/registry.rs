//! # Entity Registry
//!
//! Fixed-capacity slot table holding every entity id in one dense array.
//!
//! ```text
//! entities: [ R | a | b | c | d ‖ f | g | h ]
//!              ^ live, hierarchy order  ^ free ids, any order
//!                               count ──┘
//! indices:  entities[indices[e]] == e for every id
//! parents:  parent id, or NULL
//! ```
//!
//! Three invariants hold after every mutation:
//!
//! 1. **Density** - live entities occupy `entities[0..count)`.
//! 2. **Hierarchy order** - a live entity's parent sits at a lower index.
//! 3. **Acyclicity** - no entity is its own ancestor.
//!
//! All tables are allocated once at construction and never grow. Destroying
//! collects the doomed subtree into a scratch list first.

use crate::ecs::entity::EntityId;
use crate::ecs::hierarchy;
use crate::error::{EcsError, EcsResult};

/// Dense, hierarchy-ordered table of entity ids.
pub struct EntityRegistry {
    /// Dense array: live ids first (hierarchy order), then free ids.
    entities: Box<[EntityId]>,
    /// Inverse of `entities`, indexed by entity id.
    indices: Box<[u32]>,
    /// Parent of each entity id, `EntityId::NULL` when unparented.
    parents: Box<[EntityId]>,
    /// Number of live entities.
    count: usize,
}

impl EntityRegistry {
    /// Creates a registry with `capacity` slots, all free.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or does not leave room for the null id.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            capacity <= u32::MAX as usize,
            "Capacity must leave room for the null entity id"
        );

        #[allow(clippy::cast_possible_truncation)]
        let entities: Box<[EntityId]> = (0..capacity as u32).map(EntityId::new).collect();
        #[allow(clippy::cast_possible_truncation)]
        let indices: Box<[u32]> = (0..capacity as u32).collect();

        Self {
            entities,
            indices,
            parents: vec![EntityId::NULL; capacity].into_boxed_slice(),
            count: 0,
        }
    }

    /// Returns the maximum number of live entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no entity is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` if every slot is live.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Live entities in hierarchy order.
    #[inline]
    #[must_use]
    pub fn live(&self) -> &[EntityId] {
        &self.entities[..self.count]
    }

    /// Checks if an entity is live.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.index_of(entity).is_some()
    }

    /// Returns the dense index of a live entity.
    #[inline]
    #[must_use]
    pub fn index_of(&self, entity: EntityId) -> Option<usize> {
        let index = *self.indices.get(entity.slot())? as usize;
        (index < self.count).then_some(index)
    }

    /// Returns the live entity stored at a dense index.
    #[inline]
    #[must_use]
    pub fn entity_at(&self, index: usize) -> Option<EntityId> {
        self.live().get(index).copied()
    }

    fn require(&self, entity: EntityId) -> EcsResult<usize> {
        self.index_of(entity).ok_or(EcsError::EntityNotFound(entity))
    }

    // =========================================================================
    // Parent links
    // =========================================================================

    /// Returns the parent of a live entity (`EntityId::NULL` if unparented).
    ///
    /// # Errors
    ///
    /// `EntityNotFound` if the entity is not live.
    pub fn parent(&self, entity: EntityId) -> EcsResult<EntityId> {
        self.require(entity)?;
        Ok(self.parents[entity.slot()])
    }

    /// Returns the parent of a live entity, or `None` if it has none or is not live.
    #[inline]
    #[must_use]
    pub fn try_parent(&self, entity: EntityId) -> Option<EntityId> {
        self.index_of(entity)?;
        self.parents[entity.slot()].non_null()
    }

    /// Checks if a live entity has a parent.
    #[inline]
    #[must_use]
    pub fn has_parent(&self, entity: EntityId) -> bool {
        self.try_parent(entity).is_some()
    }

    /// Dense index of an entity's parent, `None` when unparented.
    ///
    /// This is the sort key of the hierarchy sorter.
    #[inline]
    pub(crate) fn parent_index(&self, entity: EntityId) -> Option<usize> {
        let parent = self.parents[entity.slot()];
        if parent.is_null() {
            None
        } else {
            Some(self.indices[parent.slot()] as usize)
        }
    }

    /// Re-links `entity` under `new_parent` and restores hierarchy order.
    ///
    /// Passing `EntityId::NULL` clears the link. Returns `false` when the
    /// entity was already parented to `new_parent`.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` if `entity`, or a non-null `new_parent`, is not live
    /// - `SelfParent` if `entity == new_parent`
    /// - `AncestorCycle` if `new_parent` descends from `entity`, or if
    ///   `entity` is the root, which stays unparented at index 0
    ///
    /// Nothing is mutated when an error is returned.
    pub fn set_parent(&mut self, entity: EntityId, new_parent: EntityId) -> EcsResult<bool> {
        if new_parent.is_null() {
            self.require(entity)?;
            let previous = std::mem::replace(&mut self.parents[entity.slot()], EntityId::NULL);
            return Ok(!previous.is_null());
        }

        let entity_index = self.require(entity)?;
        let parent_index = self.require(new_parent)?;

        if entity == new_parent {
            return Err(EcsError::SelfParent(entity));
        }
        if self.parents[entity.slot()] == new_parent {
            return Ok(false);
        }
        // Descendants sit behind `entity`, so a parent in front cannot be one.
        let cycle = parent_index > entity_index && self.is_descendant_of(new_parent, entity);
        if entity.is_root() || cycle {
            return Err(EcsError::AncestorCycle {
                entity,
                parent: new_parent,
            });
        }

        self.parents[entity.slot()] = new_parent;
        // A parent already in front leaves every other constraint untouched.
        if parent_index > entity_index {
            hierarchy::restore_order(self, entity_index);
        }
        Ok(true)
    }

    /// Parents an entity directly under the root.
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

    // =========================================================================
    // Hierarchy traversal
    // =========================================================================

    /// Walks from an entity's parent up to the top of its tree.
    ///
    /// The walk is bounded by tree depth, not by entity count.
    #[must_use]
    pub fn ancestors(&self, entity: EntityId) -> Ancestors<'_> {
        let next = if self.contains(entity) {
            self.parents[entity.slot()]
        } else {
            EntityId::NULL
        };
        Ancestors {
            parents: &self.parents,
            next,
        }
    }

    /// Checks if `ancestor` appears on `entity`'s ancestor chain.
    #[must_use]
    pub fn is_descendant_of(&self, entity: EntityId, ancestor: EntityId) -> bool {
        self.ancestors(entity).any(|a| a == ancestor)
    }

    /// Number of ancestors above a live entity.
    #[must_use]
    pub fn depth(&self, entity: EntityId) -> Option<usize> {
        self.index_of(entity)?;
        Some(self.ancestors(entity).count())
    }

    /// Direct children of an entity, in hierarchy order.
    ///
    /// Children always sit after their parent, so a single forward scan
    /// from the parent's index finds all of them.
    pub fn children(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let start = self.index_of(entity).map_or(self.count, |index| index + 1);
        self.live()[start..]
            .iter()
            .copied()
            .filter(move |&child| self.parents[child.slot()] == entity)
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Takes the next free id from the tail of the dense array.
    ///
    /// The new entity is unparented and sits at index `len() - 1`.
    ///
    /// # Errors
    ///
    /// `CapacityExceeded` if every slot is live. No state changes in that case.
    pub fn allocate(&mut self) -> EcsResult<EntityId> {
        if self.is_full() {
            return Err(EcsError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        let entity = self.entities[self.count];
        self.parents[entity.slot()] = EntityId::NULL;
        self.count += 1;
        Ok(entity)
    }

    /// Destroys an entity and every descendant.
    ///
    /// Descendants go first, in reverse hierarchy order, so every entity is
    /// released before its parent and `entity` itself goes last. `on_release`
    /// runs for each entity just before its slot is freed.
    ///
    /// Works iteratively, so hierarchy depth is bounded only by capacity.
    ///
    /// # Errors
    ///
    /// `EntityNotFound` if the entity is not live.
    ///
    /// # Panics
    ///
    /// Panics if asked to destroy the root.
    pub fn destroy<F>(&mut self, entity: EntityId, mut on_release: F) -> EcsResult<()>
    where
        F: FnMut(EntityId),
    {
        let start = self.require(entity)?;
        assert!(!entity.is_root(), "The root entity cannot be destroyed");

        let mut doomed = self.subtree(start);
        while let Some(next) = doomed.pop() {
            on_release(next);
            self.release(next);
        }
        Ok(())
    }

    /// Ids of the subtree rooted at dense index `start`, in hierarchy order.
    ///
    /// Every parent sits in front of its children, so a single forward scan
    /// sees a member's parent before the member itself.
    fn subtree(&self, start: usize) -> Vec<EntityId> {
        let mut positions = vec![start];
        for position in start + 1..self.count {
            let member = self
                .parent_index(self.entities[position])
                .is_some_and(|parent| positions.binary_search(&parent).is_ok());
            if member {
                positions.push(position);
            }
        }
        positions.into_iter().map(|position| self.entities[position]).collect()
    }

    /// Removes a live entity from the dense prefix, shifting later ids back.
    fn release(&mut self, entity: EntityId) {
        let index = self.indices[entity.slot()] as usize;
        self.parents[entity.slot()] = EntityId::NULL;
        self.count -= 1;
        for position in index..self.count {
            let moved = self.entities[position + 1];
            self.set_entity_index(position, moved);
        }
        self.set_entity_index(self.count, entity);
    }

    /// Stores `entity` at `position`, keeping the inverse table in step.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn set_entity_index(&mut self, position: usize, entity: EntityId) {
        self.entities[position] = entity;
        self.indices[entity.slot()] = position as u32;
    }

    /// Overwrites a parent link without any checks or reordering.
    #[cfg(test)]
    pub(crate) fn set_parent_unchecked(&mut self, entity: EntityId, parent: EntityId) {
        self.parents[entity.slot()] = parent;
    }

    /// Swaps the entities at two dense positions.
    #[inline]
    pub(crate) fn swap_positions(&mut self, a: usize, b: usize) {
        let first = self.entities[a];
        let second = self.entities[b];
        self.set_entity_index(a, second);
        self.set_entity_index(b, first);
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Verifies every registry invariant.
    ///
    /// # Errors
    ///
    /// `InvariantViolated` describing the first broken invariant found.
    pub fn validate(&self) -> EcsResult<()> {
        if self.count > self.capacity() {
            return Err(EcsError::InvariantViolated(format!(
                "count {} exceeds capacity {}",
                self.count,
                self.capacity()
            )));
        }
        for (position, &entity) in self.entities.iter().enumerate() {
            if self.indices[entity.slot()] as usize != position {
                return Err(EcsError::InvariantViolated(format!(
                    "{entity} stored at {position} but indexed at {}",
                    self.indices[entity.slot()]
                )));
            }
        }
        for (position, &entity) in self.live().iter().enumerate() {
            let parent = self.parents[entity.slot()];
            if parent.is_null() {
                continue;
            }
            match self.index_of(parent) {
                None => {
                    return Err(EcsError::InvariantViolated(format!(
                        "{entity} is parented to dead entity {parent}"
                    )))
                }
                Some(parent_position) if parent_position >= position => {
                    return Err(EcsError::InvariantViolated(format!(
                        "{entity} at {position} precedes its parent {parent} at {parent_position}"
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Iterator over an entity's ancestors, nearest first.
pub struct Ancestors<'a> {
    parents: &'a [EntityId],
    next: EntityId,
}

impl Iterator for Ancestors<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.non_null()?;
        self.next = self.parents[current.slot()];
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> EntityId {
        EntityId::new(raw)
    }

    /// Registry with a live root, like a freshly built world.
    fn registry(capacity: usize) -> EntityRegistry {
        let mut registry = EntityRegistry::new(capacity);
        assert_eq!(registry.allocate().unwrap(), EntityId::ROOT);
        registry
    }

    fn spawn(registry: &mut EntityRegistry, parent: EntityId) -> EntityId {
        let entity = registry.allocate().unwrap();
        registry.set_parent(entity, parent).unwrap();
        entity
    }

    #[test]
    fn test_registry_creation() {
        let registry = EntityRegistry::new(8);
        assert_eq!(registry.capacity(), 8);
        assert!(registry.is_empty());
        assert!(!registry.contains(id(0)));
        registry.validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "Capacity must be greater than zero")]
    fn test_zero_capacity_panics() {
        let _ = EntityRegistry::new(0);
    }

    #[test]
    fn test_allocate_until_full() {
        let mut registry = registry(3);
        assert_eq!(registry.allocate().unwrap(), id(1));
        assert_eq!(registry.allocate().unwrap(), id(2));
        assert!(registry.is_full());
        assert_eq!(
            registry.allocate(),
            Err(EcsError::CapacityExceeded { capacity: 3 })
        );
        assert_eq!(registry.len(), 3);
        registry.validate().unwrap();
    }

    #[test]
    fn test_parent_lookups() {
        let mut registry = registry(4);
        let a = spawn(&mut registry, EntityId::ROOT);
        assert_eq!(registry.parent(a).unwrap(), EntityId::ROOT);
        assert_eq!(registry.try_parent(a), Some(EntityId::ROOT));
        assert!(registry.has_parent(a));
        assert!(!registry.has_parent(EntityId::ROOT));
        assert_eq!(registry.parent(id(3)), Err(EcsError::EntityNotFound(id(3))));
        assert_eq!(registry.try_parent(id(3)), None);
    }

    #[test]
    fn test_set_parent_rejections() {
        let mut registry = registry(8);
        let a = spawn(&mut registry, EntityId::ROOT);
        let b = spawn(&mut registry, a);
        let c = spawn(&mut registry, b);

        assert_eq!(registry.set_parent(a, a), Err(EcsError::SelfParent(a)));
        assert_eq!(
            registry.set_parent(a, c),
            Err(EcsError::AncestorCycle { entity: a, parent: c })
        );
        assert_eq!(
            registry.set_parent(EntityId::ROOT, c),
            Err(EcsError::AncestorCycle {
                entity: EntityId::ROOT,
                parent: c
            })
        );
        assert_eq!(
            registry.set_parent(a, id(6)),
            Err(EcsError::EntityNotFound(id(6)))
        );
        assert_eq!(registry.set_parent(b, a), Ok(false));
        registry.validate().unwrap();
    }

    #[test]
    fn test_unparent_clears_link() {
        let mut registry = registry(4);
        let a = spawn(&mut registry, EntityId::ROOT);
        assert_eq!(registry.unparent(a), Ok(true));
        assert!(!registry.has_parent(a));
        assert_eq!(registry.unparent(a), Ok(false));
        assert_eq!(registry.parent_to_root(a), Ok(true));
        registry.validate().unwrap();
    }

    #[test]
    fn test_reparent_moves_parent_first() {
        let mut registry = registry(4);
        let one = spawn(&mut registry, EntityId::ROOT);
        let two = spawn(&mut registry, one);
        let three = spawn(&mut registry, EntityId::ROOT);

        registry.set_parent(one, three).unwrap();

        let i1 = registry.index_of(one).unwrap();
        let i2 = registry.index_of(two).unwrap();
        let i3 = registry.index_of(three).unwrap();
        assert!(i3 < i1);
        assert!(i1 < i2);
        registry.validate().unwrap();
    }

    #[test]
    fn test_traversal() {
        let mut registry = registry(8);
        let a = spawn(&mut registry, EntityId::ROOT);
        let b = spawn(&mut registry, a);
        let c = spawn(&mut registry, a);
        let d = spawn(&mut registry, b);

        assert_eq!(registry.children(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(
            registry.ancestors(d).collect::<Vec<_>>(),
            vec![b, a, EntityId::ROOT]
        );
        assert!(registry.is_descendant_of(d, a));
        assert!(!registry.is_descendant_of(c, b));
        assert_eq!(registry.depth(d), Some(3));
        assert_eq!(registry.depth(EntityId::ROOT), Some(0));
    }

    #[test]
    fn test_destroy_cascades_and_compacts() {
        let mut registry = registry(8);
        let a = spawn(&mut registry, EntityId::ROOT);
        let b = spawn(&mut registry, a);
        let keep = spawn(&mut registry, EntityId::ROOT);
        let c = spawn(&mut registry, b);

        let mut released = Vec::new();
        registry.destroy(a, |e| released.push(e)).unwrap();

        assert_eq!(released, vec![c, b, a]);
        assert_eq!(registry.live(), &[EntityId::ROOT, keep]);
        assert!(!registry.contains(a));
        assert_eq!(registry.destroy(a, |_| {}), Err(EcsError::EntityNotFound(a)));
        registry.validate().unwrap();

        // Freed ids come back from the tail, most recently freed first.
        assert_eq!(registry.allocate().unwrap(), a);
    }

    #[test]
    fn test_root_cannot_be_parented() {
        let mut registry = registry(4);
        let loose = registry.allocate().unwrap();
        let before = registry.live().to_vec();

        assert_eq!(
            registry.set_parent(EntityId::ROOT, loose),
            Err(EcsError::AncestorCycle {
                entity: EntityId::ROOT,
                parent: loose
            })
        );
        assert_eq!(registry.live(), before.as_slice());
        assert!(!registry.has_parent(EntityId::ROOT));
        assert_eq!(registry.unparent(EntityId::ROOT), Ok(false));
        registry.validate().unwrap();
    }

    #[test]
    fn test_unparent_requires_live_entity() {
        let mut registry = registry(4);
        let a = spawn(&mut registry, EntityId::ROOT);
        registry.destroy(a, |_| {}).unwrap();

        assert_eq!(registry.unparent(a), Err(EcsError::EntityNotFound(a)));
        assert_eq!(registry.unparent(id(9)), Err(EcsError::EntityNotFound(id(9))));
        registry.validate().unwrap();
    }

    #[test]
    fn test_destroy_releases_children_before_parents() {
        let mut registry = registry(8);
        let a = spawn(&mut registry, EntityId::ROOT);
        let b = spawn(&mut registry, a);
        let c = spawn(&mut registry, a);
        let d = spawn(&mut registry, b);
        let keep = spawn(&mut registry, EntityId::ROOT);

        let mut released = Vec::new();
        registry.destroy(a, |e| released.push(e)).unwrap();

        assert_eq!(released.len(), 4);
        assert_eq!(released.last(), Some(&a));
        let position = |e| released.iter().position(|&r| r == e).unwrap();
        assert!(position(d) < position(b));
        assert!(position(c) < position(a));
        assert_eq!(registry.live(), &[EntityId::ROOT, keep]);
        registry.validate().unwrap();
    }

    #[test]
    fn test_destroy_deep_chain() {
        let depth = 100_000;
        let mut registry = registry(depth + 3);
        let top = spawn(&mut registry, EntityId::ROOT);
        let mut tail = top;
        for _ in 0..depth {
            tail = spawn(&mut registry, tail);
        }
        let keep = spawn(&mut registry, EntityId::NULL);
        assert!(registry.is_full());

        let mut released = 0;
        registry.destroy(top, |_| released += 1).unwrap();

        assert_eq!(released, depth + 1);
        assert_eq!(registry.live(), &[EntityId::ROOT, keep]);
        registry.validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "The root entity cannot be destroyed")]
    fn test_destroy_root_panics() {
        let mut registry = registry(2);
        let _ = registry.destroy(EntityId::ROOT, |_| {});
    }
}
