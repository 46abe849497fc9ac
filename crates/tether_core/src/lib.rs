//! Tether Engine Core
//!
//! Contains the fundamental simulation systems:
//! - Generational handle table (object ownership and stale-handle detection)
//! - Spatial hash grids (radius queries over tracked positions)
//! - World and per-tick simulation driver
//! - Deterministic time and math

pub mod config;
pub mod error;
pub mod handle;
pub mod math;
pub mod pool;
pub mod sim;
pub mod spatial;
pub mod time;
pub mod world;

pub use glam;

pub use config::{GridConfig, RuntimeConfig, WorldConfig};
pub use error::{ConfigError, GridError, HandleError, SimError};
pub use handle::{Category, DestroyQueue, Handle, HandleTable};
pub use pool::SlotMap;
pub use sim::{SimTickReport, Simulation};
pub use spatial::{GridEntry, GridStats, SpatialHashGrid};
pub use world::{Mobility, TickReport, World};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
