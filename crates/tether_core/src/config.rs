//! Configuration for grids, the world and the headless runtime.
//!
//! All structs deserialize from JSON with every field optional; missing
//! fields take the values from `Default`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Spatial hash grid settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of a cubic cell, in world units.
    pub cell_spacing: f32,
    /// Lower bound on the bucket count regardless of membership.
    pub min_buckets: u32,
    /// Entity table capacity reserved up front.
    pub initial_capacity: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_spacing: 4.0,
            min_buckets: 64,
            initial_capacity: 256,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_spacing.is_finite() && self.cell_spacing > 0.0) {
            return Err(ConfigError::Invalid {
                reason: format!("cell_spacing must be positive, got {}", self.cell_spacing),
            });
        }
        if self.min_buckets == 0 {
            return Err(ConfigError::Invalid {
                reason: "min_buckets must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Settings for the two grids composed by [`World`](crate::world::World).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub dynamic: GridConfig,
    pub statics: GridConfig,
    /// Simulated ticks per second; sets the duration each tick advances time by.
    pub tick_rate_hz: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            dynamic: GridConfig::default(),
            statics: GridConfig {
                cell_spacing: 8.0,
                ..GridConfig::default()
            },
            tick_rate_hz: crate::time::TICK_RATE_HZ,
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dynamic.validate()?;
        self.statics.validate()?;
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid {
                reason: "tick_rate_hz must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Settings for the headless demo driven by `tether_runtime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub world: WorldConfig,
    /// Objects moved every tick.
    pub population: u32,
    /// Objects placed once and never moved.
    pub static_population: u32,
    pub ticks: u32,
    /// Half-extent of the cube objects are scattered in.
    pub world_extent: f32,
    pub query_radius: f32,
    /// Output buffer size handed to each query.
    pub query_capacity: u32,
    /// Chance per tick that a dynamic object is despawned and replaced.
    pub churn: f32,
    pub seed: u64,
    /// Log statistics every this many ticks.
    pub report_interval: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            population: 2_000,
            static_population: 500,
            ticks: 600,
            world_extent: 200.0,
            query_radius: 10.0,
            query_capacity: 64,
            churn: 0.002,
            seed: 0x5EED,
            report_interval: 60,
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        if !(self.world_extent.is_finite() && self.world_extent > 0.0) {
            return Err(ConfigError::Invalid {
                reason: format!("world_extent must be positive, got {}", self.world_extent),
            });
        }
        if !(0.0..=1.0).contains(&self.churn) {
            return Err(ConfigError::Invalid {
                reason: format!("churn must be within [0, 1], got {}", self.churn),
            });
        }
        if self.report_interval == 0 {
            return Err(ConfigError::Invalid {
                reason: "report_interval must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = WorldConfig::from_json_str(r#"{ "dynamic": { "cell_spacing": 2.5 } }"#)
            .expect("valid config");
        assert_eq!(config.dynamic.cell_spacing, 2.5);
        assert_eq!(config.dynamic.min_buckets, GridConfig::default().min_buckets);
        assert_eq!(config.statics, WorldConfig::default().statics);
    }

    #[test]
    fn rejects_non_positive_spacing() {
        let err = WorldConfig::from_json_str(r#"{ "statics": { "cell_spacing": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let err = WorldConfig::from_json_str(r#"{ "tick_rate_hz": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RuntimeConfig::from_json_str("{ ticks: 3 }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn runtime_defaults_are_valid() {
        RuntimeConfig::default().validate().expect("defaults validate");
        let config = RuntimeConfig::from_json_str(r#"{ "ticks": 3, "churn": 0.5 }"#).unwrap();
        assert_eq!(config.ticks, 3);
        assert_eq!(config.population, RuntimeConfig::default().population);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = RuntimeConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
