use crate::handle::Handle;
use thiserror::Error;

/// Errors raised by the generational handle table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("handle {handle} is stale or was never issued")]
    InvalidHandle { handle: Handle },

    #[error("handle table exhausted its index space at {slots} slots")]
    CapacityExhausted { slots: usize },

    #[error("generation counter of slot {index} would wrap; slot retired")]
    GenerationOverflow { index: u32 },
}

/// Errors raised by a spatial hash grid's membership table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("id {id} is not tracked by this grid")]
    NotFound { id: u32 },
}

/// Errors surfaced by the per-tick simulation driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Errors loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}
