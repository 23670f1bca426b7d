//! # ECS Error Types
//!
//! All errors that can be reported to the caller of a world operation.

use thiserror::Error;

use crate::ecs::{EntityId, Phase};

/// Errors that can occur while mutating or querying a world.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Entity creation attempted while every slot is live.
    #[error("entity capacity exceeded: all {capacity} slots are live")]
    CapacityExceeded {
        /// Fixed capacity of the world.
        capacity: usize,
    },

    /// Operation referenced a destroyed or out-of-range entity.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Attempted to parent an entity to itself.
    #[error("entity {0} cannot be its own parent")]
    SelfParent(EntityId),

    /// Re-parenting would make an entity its own ancestor.
    #[error("parenting {entity} to {parent} would create a cycle")]
    AncestorCycle {
        /// Entity being re-parented.
        entity: EntityId,
        /// Requested parent, which is a descendant of `entity`.
        parent: EntityId,
    },

    /// Component type used before registration.
    #[error("component type not registered: {0}")]
    ComponentTypeNotRegistered(&'static str),

    /// Component type registered twice.
    #[error("component type already registered: {0}")]
    ComponentTypeAlreadyRegistered(&'static str),

    /// Entity already holds a component of this type.
    #[error("entity {entity} already has a {component} component")]
    ComponentAlreadyPresent {
        /// Target entity.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// Entity holds no component of this type.
    #[error("entity {entity} has no {component} component")]
    ComponentNotPresent {
        /// Target entity.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// Removal asked for a specific value that no longer matches.
    #[error("{component} component on entity {entity} does not match the expected value")]
    ComponentValueConflict {
        /// Target entity.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// System with this name already sits in the phase list.
    #[error("system {name} already registered in the {phase} phase")]
    SystemAlreadyRegistered {
        /// System name.
        name: String,
        /// Target phase.
        phase: Phase,
    },

    /// Invalid world configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal tables disagree with one of the registry invariants.
    #[error("registry invariant violated: {0}")]
    InvariantViolated(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
