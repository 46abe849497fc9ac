//! Sparse per-object storage keyed by handle index.

mod slot_map;

pub use slot_map::SlotMap;
