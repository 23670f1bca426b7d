//! # Entity Component System
//!
//! A hierarchy-ordered ECS core.
//!
//! ## Design Philosophy
//!
//! - All storage is pre-allocated at world creation
//! - Live entities form a dense prefix kept in hierarchy order, so a forward
//!   walk always visits a parent before its children
//! - Components are stored per type, keyed by entity id, and never move when
//!   the hierarchy is reordered
//! - Systems run synchronously, in registration order

mod component;
mod entity;
mod events;
mod hierarchy;
mod query;
mod registry;
mod storage;
mod store;
mod system;
mod world;

pub use component::{Component, Pose};
pub use entity::EntityId;
pub use events::{ComponentObserver, EntityObserver, WorldEvents};
pub use query::{Bundle, ComponentSet, EntityQuery};
pub use registry::{Ancestors, EntityRegistry};
pub use storage::ComponentStorage;
pub use store::ComponentStore;
pub use system::{FrameTime, Phase, PoseSync, System, SystemPipeline};
pub use world::World;
