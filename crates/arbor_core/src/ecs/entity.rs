//! # Entity Identifiers
//!
//! Entities are plain slot numbers in `[0, capacity)`.
//! A destroyed id is recycled positionally; there is no generation counter.

use std::fmt;

/// Unique identifier for an entity.
///
/// The value doubles as the key into every per-entity table
/// (index table, parent table, component storages).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// The world root. Always live, never destroyed, has no parent.
    pub const ROOT: Self = Self(0);

    /// Null/invalid entity ID ("no entity").
    pub const NULL: Self = Self(u32::MAX);

    /// Creates an entity ID from a raw slot number.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw slot number.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the slot number as a table index.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    /// Checks if this is the world root.
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }

    /// Converts the null sentinel into `None`.
    #[inline]
    #[must_use]
    pub const fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl From<Option<EntityId>> for EntityId {
    fn from(value: Option<EntityId>) -> Self {
        value.unwrap_or(Self::NULL)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("#null")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}
