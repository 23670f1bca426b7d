//! # System Pipeline
//!
//! Systems are registered into one of two phases and run in registration
//! order once per frame:
//!
//! ```text
//! tick(frame)
//!   ├─ Update: gameplay systems, in registration order
//!   └─ Draw:   presentation systems (PoseSync first when enabled)
//! ```
//!
//! A failing system aborts the rest of its phase; the error is returned to
//! the caller of `update`/`draw`/`tick` and every system stays registered.

use std::fmt;
use std::time::Duration;

use super::component::Pose;
use super::registry::EntityRegistry;
use super::store::ComponentStore;
use super::world::World;
use crate::error::{EcsError, EcsResult};

/// Pipeline phase a system runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Simulation step.
    Update,
    /// Presentation step, after every update system.
    Draw,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => f.write_str("update"),
            Self::Draw => f.write_str("draw"),
        }
    }
}

/// Timing of the frame being processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameTime {
    /// Time since the previous frame.
    pub delta: Duration,
    /// Time since the first frame.
    pub total: Duration,
    /// Frame number, starting at zero.
    pub frame: u64,
}

impl FrameTime {
    /// Creates frame timing.
    #[must_use]
    pub const fn new(delta: Duration, total: Duration, frame: u64) -> Self {
        Self { delta, total, frame }
    }

    /// Timing of the next frame after `delta` has elapsed.
    #[must_use]
    pub fn advance(self, delta: Duration) -> Self {
        Self {
            delta,
            total: self.total + delta,
            frame: self.frame + 1,
        }
    }

    /// Delta time in seconds.
    #[inline]
    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// A unit of per-frame work over the world.
///
/// # Example
///
/// ```rust,ignore
/// struct Gravity;
///
/// impl System for Gravity {
///     fn process(&mut self, world: &mut World, time: &FrameTime) -> EcsResult<()> {
///         let falling = world.collect_entities(&ComponentSet::new().with::<Pose>())?;
///         for entity in falling {
///             world.get_component_mut::<Pose>(entity)?.translation[1] -= time.delta_seconds();
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait System {
    /// Name used for duplicate detection and logs.
    ///
    /// A phase holds at most one system per name. The default is the type
    /// name, so registering several instances of one type in the same phase
    /// (two differently tuned `Gravity`s, say) requires overriding this with
    /// a per-instance name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs the system for one frame.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining systems of the phase.
    fn process(&mut self, world: &mut World, time: &FrameTime) -> EcsResult<()>;
}

/// Ordered system lists of both phases.
#[derive(Default)]
pub struct SystemPipeline {
    update: Vec<Box<dyn System>>,
    draw: Vec<Box<dyn System>>,
}

impl SystemPipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a system to a phase.
    ///
    /// # Errors
    ///
    /// `SystemAlreadyRegistered` if the phase already holds a system with
    /// the same [`name`](System::name), including another instance of the
    /// same type that keeps the default name.
    pub fn add(&mut self, phase: Phase, system: Box<dyn System>) -> EcsResult<()> {
        let systems = self.systems_mut(phase);
        if systems.iter().any(|existing| existing.name() == system.name()) {
            return Err(EcsError::SystemAlreadyRegistered {
                name: system.name().to_owned(),
                phase,
            });
        }
        systems.push(system);
        Ok(())
    }

    /// Number of systems in a phase.
    #[must_use]
    pub fn len(&self, phase: Phase) -> usize {
        self.systems(phase).len()
    }

    /// Returns `true` if neither phase holds a system.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.update.is_empty() && self.draw.is_empty()
    }

    /// System names of a phase, in run order.
    pub fn names(&self, phase: Phase) -> impl Iterator<Item = &str> {
        self.systems(phase).iter().map(|system| system.name())
    }

    /// Moves a phase's systems out so they can borrow the world mutably.
    pub(crate) fn take(&mut self, phase: Phase) -> Vec<Box<dyn System>> {
        std::mem::take(self.systems_mut(phase))
    }

    /// Puts taken systems back in front of any registered while they ran.
    pub(crate) fn restore(&mut self, phase: Phase, mut systems: Vec<Box<dyn System>>) {
        let slot = self.systems_mut(phase);
        systems.append(slot);
        *slot = systems;
    }

    fn systems(&self, phase: Phase) -> &Vec<Box<dyn System>> {
        match phase {
            Phase::Update => &self.update,
            Phase::Draw => &self.draw,
        }
    }

    fn systems_mut(&mut self, phase: Phase) -> &mut Vec<Box<dyn System>> {
        match phase {
            Phase::Update => &mut self.update,
            Phase::Draw => &mut self.draw,
        }
    }
}

impl fmt::Debug for SystemPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemPipeline")
            .field("update", &self.names(Phase::Update).collect::<Vec<_>>())
            .field("draw", &self.names(Phase::Draw).collect::<Vec<_>>())
            .finish()
    }
}

/// Built-in draw system deriving world poses from local ones.
///
/// Walks the live range in hierarchy order, so every parent's world pose is
/// final before its children read it.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoseSync;

impl PoseSync {
    /// Registered name.
    pub const NAME: &'static str = "pose_sync";
}

impl System for PoseSync {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(&mut self, world: &mut World, _time: &FrameTime) -> EcsResult<()> {
        world.sync_poses();
        Ok(())
    }
}

/// Recomputes every world pose. Entities without a [`Pose`] are skipped, and
/// their children are treated as top-level.
pub(crate) fn sync_poses(registry: &EntityRegistry, store: &mut ComponentStore) {
    let Ok(poses) = store.storage_mut::<Pose>() else {
        return;
    };
    for &entity in registry.live() {
        let parent_pose = registry
            .try_parent(entity)
            .and_then(|parent| poses.get(parent).copied());
        if let Some(pose) = poses.get_mut(entity) {
            match parent_pose {
                Some(parent_pose) => pose.sync_with_parent(&parent_pose),
                None => pose.sync_as_root(),
            }
        }
    }
}
