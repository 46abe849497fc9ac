// world.rs - dynamic + static spatial grids behind one query surface

use crate::config::WorldConfig;
use crate::error::GridError;
use crate::spatial::SpatialHashGrid;
use crate::time::SimulationTime;
use glam::Vec3;
use tether_metrics::{time_phase, PhaseProfiler};

/// Which grid an object lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mobility {
    /// Expected to move every tick; rehashed every tick.
    Dynamic,
    /// Moves rarely; rehashed only after structural changes.
    Static,
}

/// What a call to [`World::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Tick number after advancing.
    pub tick: u64,
    pub moves_applied: usize,
    pub dynamic_indexed: usize,
    pub static_rehashed: bool,
    pub static_indexed: usize,
}

/// Composes a grid for moving objects and a grid for static ones.
///
/// Moves are buffered by [`mark_moved`](Self::mark_moved) and applied at the
/// next [`tick`](Self::tick); queries in between see the state of the last
/// tick.
pub struct World {
    dynamic: SpatialHashGrid,
    statics: SpatialHashGrid,
    pending_moves: Vec<(u32, Vec3)>,
    static_dirty: bool,
    time: SimulationTime,
    profiler: PhaseProfiler,
}

impl World {
    /// Samples averaged per profiled phase.
    const PROFILE_WINDOW: usize = 60;

    pub fn new(config: &WorldConfig) -> Self {
        Self {
            dynamic: SpatialHashGrid::new(&config.dynamic),
            statics: SpatialHashGrid::new(&config.statics),
            pending_moves: Vec::new(),
            static_dirty: false,
            time: SimulationTime::with_tick_rate(config.tick_rate_hz),
            profiler: PhaseProfiler::new(Self::PROFILE_WINDOW),
        }
    }

    /// Track `id` at `position` in the grid matching `mobility`.
    ///
    /// An id already tracked in the other grid is moved across. Moves
    /// buffered for `id` are dropped; `position` wins.
    pub fn insert(&mut self, id: u32, position: Vec3, mobility: Mobility) {
        self.pending_moves.retain(|&(moved, _)| moved != id);
        match mobility {
            Mobility::Dynamic => {
                if self.statics.remove(id).is_ok() {
                    self.static_dirty = true;
                }
                self.dynamic.insert(id, position);
            }
            Mobility::Static => {
                let _ = self.dynamic.remove(id);
                self.statics.insert(id, position);
                self.static_dirty = true;
            }
        }
    }

    /// Stop tracking `id`, discarding any move buffered for it.
    pub fn remove(&mut self, id: u32) -> Result<Mobility, GridError> {
        if self.dynamic.remove(id).is_ok() {
            self.pending_moves.retain(|&(moved, _)| moved != id);
            return Ok(Mobility::Dynamic);
        }
        self.statics.remove(id)?;
        self.static_dirty = true;
        Ok(Mobility::Static)
    }

    /// Buffer a new position for a dynamic object, applied at the next tick.
    pub fn mark_moved(&mut self, id: u32, position: Vec3) -> Result<(), GridError> {
        if !self.dynamic.contains(id) {
            return Err(GridError::NotFound { id });
        }
        self.pending_moves.push((id, position));
        Ok(())
    }

    /// Apply buffered moves and rebuild the grids.
    ///
    /// The dynamic grid is always rehashed; the static grid only after an
    /// insert or remove since the previous tick.
    pub fn tick(&mut self) -> Result<TickReport, GridError> {
        let moves_applied = time_phase!(self.profiler, "moves", {
            Self::apply_moves(&mut self.dynamic, &mut self.pending_moves)
        })?;

        time_phase!(self.profiler, "rehash_dynamic", { self.dynamic.rehash() });

        let static_rehashed = self.static_dirty;
        if static_rehashed {
            time_phase!(self.profiler, "rehash_static", { self.statics.rehash() });
            self.static_dirty = false;
        }

        self.time.advance_tick();
        let report = TickReport {
            tick: self.time.tick_count(),
            moves_applied,
            dynamic_indexed: self.dynamic.indexed_len(),
            static_rehashed,
            static_indexed: self.statics.indexed_len(),
        };
        tracing::trace!(?report, "world tick");
        Ok(report)
    }

    fn apply_moves(
        grid: &mut SpatialHashGrid,
        moves: &mut Vec<(u32, Vec3)>,
    ) -> Result<usize, GridError> {
        let count = moves.len();
        for (id, position) in moves.drain(..) {
            grid.update_position(id, position)?;
        }
        Ok(count)
    }

    /// Collect ids within `radius` of `position` into `out`.
    ///
    /// Dynamic objects are written first; static objects fill whatever room
    /// is left when `include_static` is set. Returns the number written.
    pub fn query_nearby(
        &self,
        position: Vec3,
        radius: f32,
        out: &mut [u32],
        include_static: bool,
    ) -> usize {
        self.query_nearby_filtered(position, radius, out, include_static, |_| true)
    }

    /// [`query_nearby`](Self::query_nearby) reporting only ids accepted by
    /// `keep`; rejected ids take no room in `out`.
    pub fn query_nearby_filtered<F>(
        &self,
        position: Vec3,
        radius: f32,
        out: &mut [u32],
        include_static: bool,
        keep: F,
    ) -> usize
    where
        F: Fn(u32) -> bool,
    {
        let count = self.dynamic.query_filtered(position, radius, out, 0, &keep);
        if include_static && count < out.len() {
            return self.statics.query_filtered(position, radius, out, count, &keep);
        }
        count
    }

    pub fn mobility_of(&self, id: u32) -> Option<Mobility> {
        if self.dynamic.contains(id) {
            Some(Mobility::Dynamic)
        } else if self.statics.contains(id) {
            Some(Mobility::Static)
        } else {
            None
        }
    }

    /// Latest known position, including moves not yet applied.
    pub fn position_of(&self, id: u32) -> Option<Vec3> {
        if let Some(&(_, position)) = self.pending_moves.iter().rev().find(|(moved, _)| *moved == id) {
            return Some(position);
        }
        self.dynamic.position(id).or_else(|| self.statics.position(id))
    }

    /// Number of tracked objects across both grids.
    pub fn len(&self) -> usize {
        self.dynamic.len() + self.statics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_moves(&self) -> usize {
        self.pending_moves.len()
    }

    pub fn is_static_dirty(&self) -> bool {
        self.static_dirty
    }

    pub fn tick_count(&self) -> u64 {
        self.time.tick_count()
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn dynamic_grid(&self) -> &SpatialHashGrid {
        &self.dynamic
    }

    pub fn static_grid(&self) -> &SpatialHashGrid {
        &self.statics
    }

    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }
}
