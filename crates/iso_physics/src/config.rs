//! World configuration
//!
//! Hosts can construct a [`WorldConfig`] in code or load one from a TOML
//! file. Every field has a default, so a config file only needs to state
//! what it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::geom::Box3;
use crate::physics::CollisionFlags;

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML or has wrong field types
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunable world parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World gravity applied to every gravity-enabled body
    pub gravity: Vec3,
    /// The region the world simulates in
    pub bounds: Box3,
    /// Which world-bounds faces bodies rebound from
    pub check_collision: CollisionFlags,
    /// Octree node capacity before splitting
    pub max_objects: usize,
    /// Octree depth cap
    pub max_levels: u32,
    /// Padding added to the maximum allowed separation distance
    pub overlap_bias: f32,
    /// Always resolve X and Y before Z regardless of gravity
    pub force_xy: bool,
    /// Disable the octree broad phase entirely
    pub skip_tree: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::zeros(),
            bounds: Box3::new(0.0, 0.0, 0.0, 512.0, 512.0, 256.0),
            check_collision: CollisionFlags::default(),
            max_objects: 10,
            max_levels: 4,
            overlap_bias: 4.0,
            force_xy: false,
            skip_tree: false,
        }
    }
}

impl WorldConfig {
    /// Parse a configuration from a TOML string. Missing fields keep their
    /// defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        log::info!("loaded world config from {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.gravity, Vec3::zeros());
        assert_eq!(config.max_objects, 10);
        assert_eq!(config.max_levels, 4);
        assert!((config.overlap_bias - 4.0).abs() < f32::EPSILON);
        assert!(!config.force_xy);
        assert!(config.check_collision.up);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WorldConfig::from_toml_str(
            r#"
            gravity = [0.0, 0.0, -500.0]
            max_objects = 4

            [bounds]
            width_x = 1024.0
            width_y = 1024.0
            height = 512.0
            "#,
        )
        .unwrap();

        assert!((config.gravity.z + 500.0).abs() < f32::EPSILON);
        assert_eq!(config.max_objects, 4);
        assert_eq!(config.max_levels, 4);
        assert!((config.bounds.width_x - 1024.0).abs() < f32::EPSILON);
        assert!((config.bounds.x).abs() < f32::EPSILON);
    }

    #[test]
    fn test_face_mask_toml() {
        let config = WorldConfig::from_toml_str(
            r#"
            [check_collision]
            down = false
            "#,
        )
        .unwrap();

        assert!(!config.check_collision.down);
        assert!(config.check_collision.up);
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        let err = WorldConfig::from_toml_str("max_objects = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_round_trip() {
        let mut config = WorldConfig::default();
        config.gravity.z = -250.0;
        config.skip_tree = true;

        let text = toml::to_string(&config).unwrap();
        let back = WorldConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
