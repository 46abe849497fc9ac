//! Spatial hash index answering radius queries over tracked positions.
//!
//! Space is cut into cubes of edge `cell_spacing`; each cube hashes into one
//! of a membership-proportional number of buckets. The index is rebuilt in
//! full by [`SpatialHashGrid::rehash`] and read by
//! [`SpatialHashGrid::query`] until the next rebuild.

mod cell;
mod grid;

pub use grid::{GridEntry, GridStats, SpatialHashGrid};
