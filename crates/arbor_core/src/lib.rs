//! # ARBOR Core
//!
//! Hierarchy-ordered Entity Component System runtime:
//! - Fixed-capacity entity registry whose live range is always in hierarchy
//!   order (every parent before its children)
//! - Type-indexed component store with observer hooks
//! - Two-phase (update/draw) system pipeline
//!
//! ## Architecture Rules
//!
//! 1. **Pre-allocated storage** - capacity is fixed when the world is built
//! 2. **Order is an invariant** - it holds after every mutation, not eventually
//! 3. **Errors are values** - expected failures return [`EcsError`]; only
//!    programmer errors panic
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_core::{FrameTime, World};
//!
//! let mut world = World::new(1024);
//! let body = world.create_entity()?;
//! let arm = world.create_child(body)?;
//! world.tick(&FrameTime::default())?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::WorldConfig;
pub use ecs::{
    Bundle, Component, ComponentSet, ComponentStore, EntityId, EntityQuery, EntityRegistry,
    FrameTime, Phase, Pose, PoseSync, System, World,
};
pub use error::{EcsError, EcsResult};
