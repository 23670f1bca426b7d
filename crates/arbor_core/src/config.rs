//! # World Configuration
//!
//! Capacity and diagnostics switches of a [`World`](crate::World).
//!
//! ```toml
//! capacity = 4096
//! log_entity_events = false
//! pose_sync = true
//! ```
//!
//! Every key is optional; missing keys keep their [`Default`] value.

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Default number of entity slots, root included.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Configuration of a world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Fixed number of entity slots, root included.
    pub capacity: usize,
    /// Emit `debug!` events for entity and component changes.
    pub log_entity_events: bool,
    /// Register the built-in `PoseSync` draw system.
    pub pose_sync: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            log_entity_events: true,
            pose_sync: true,
        }
    }
}

impl WorldConfig {
    /// Default configuration with a different capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on malformed TOML, unknown keys or an out-of-range
    /// capacity.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| EcsError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration back to TOML.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if serialization fails.
    pub fn to_toml_string(&self) -> EcsResult<String> {
        toml::to_string(self).map_err(|err| EcsError::InvalidConfig(err.to_string()))
    }

    /// Checks that the capacity fits the id space.
    ///
    /// `u32::MAX` is reserved for `EntityId::NULL`, so at most `u32::MAX` slots
    /// (ids `0..u32::MAX`) are addressable.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the capacity is zero or too large.
    pub fn validate(&self) -> EcsResult<()> {
        if self.capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "capacity must hold at least the root entity".to_owned(),
            ));
        }
        if u32::try_from(self.capacity).is_err() {
            return Err(EcsError::InvalidConfig(format!(
                "capacity {} exceeds the id space ({})",
                self.capacity,
                u32::MAX
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorldConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert!(config.log_entity_events);
        assert!(config.pose_sync);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WorldConfig::from_toml_str("capacity = 16").unwrap();
        assert_eq!(config, WorldConfig::with_capacity(16));
    }

    #[test]
    fn test_full_toml() {
        let config = WorldConfig::from_toml_str(
            "capacity = 64\nlog_entity_events = false\npose_sync = false\n",
        )
        .unwrap();
        assert_eq!(config.capacity, 64);
        assert!(!config.log_entity_events);
        assert!(!config.pose_sync);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        for source in ["capacity = 0", "capacity = \"many\"", "frames = 3", "capacity ="] {
            assert!(
                matches!(WorldConfig::from_toml_str(source), Err(EcsError::InvalidConfig(_))),
                "accepted {source:?}"
            );
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = WorldConfig {
            capacity: 32,
            log_entity_events: false,
            pose_sync: true,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(WorldConfig::from_toml_str(&text).unwrap(), config);
    }
}
