//! # Component System
//!
//! Components are pure data attached to an entity and owned by the
//! component store. Every entity receives a [`Pose`] when it is created.

use bytemuck::{Pod, Zeroable};

/// Marker trait for ECS components.
///
/// Implement it for every type stored in a world, then register the type
/// once with `World::register_component`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Debug, PartialEq)]
/// struct Health(u32);
///
/// impl Component for Health {}
/// ```
pub trait Component: 'static {
    /// Human-readable type name used in errors and logs.
    #[must_use]
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Built-in transform of an entity relative to its parent.
///
/// The local half is written by gameplay code; the world half is derived by
/// the pose-sync draw system from the parent's world pose.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Pose {
    /// Translation relative to the parent.
    pub translation: [f32; 3],
    /// Uniform scale relative to the parent.
    pub scale: f32,
    /// Translation in world space.
    pub world_translation: [f32; 3],
    /// Uniform scale in world space.
    pub world_scale: f32,
}

impl Component for Pose {}

impl Pose {
    /// No offset, unit scale.
    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        scale: 1.0,
        world_translation: [0.0; 3],
        world_scale: 1.0,
    };

    /// Creates a pose at a local translation.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: [x, y, z],
            ..Self::IDENTITY
        }
    }

    /// Returns this pose with a different local scale.
    #[inline]
    #[must_use]
    pub const fn with_scale(self, scale: f32) -> Self {
        Self { scale, ..self }
    }

    /// Sets the world half for an entity without a parent.
    #[inline]
    pub fn sync_as_root(&mut self) {
        self.world_translation = self.translation;
        self.world_scale = self.scale;
    }

    /// Composes the world half from a parent's world pose.
    #[inline]
    pub fn sync_with_parent(&mut self, parent: &Self) {
        for axis in 0..3 {
            self.world_translation[axis] =
                parent.world_translation[axis] + parent.world_scale * self.translation[axis];
        }
        self.world_scale = parent.world_scale * self.scale;
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_default_is_identity() {
        let pose = Pose::default();
        assert_eq!(pose, Pose::IDENTITY);
        assert!((pose.scale - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pose_composition() {
        let mut parent = Pose::new(10.0, 0.0, 0.0).with_scale(2.0);
        parent.sync_as_root();

        let mut child = Pose::new(1.0, 2.0, 3.0);
        child.sync_with_parent(&parent);

        assert_eq!(child.world_translation, [12.0, 4.0, 6.0]);
        assert!((child.world_scale - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pose_size() {
        assert_eq!(std::mem::size_of::<Pose>(), 32);
    }

    #[test]
    fn test_type_name() {
        assert!(Pose::type_name().ends_with("Pose"));
    }
}
