//! Per-tick simulation driver.
//!
//! Owns the handle table and the world and enforces the tick order:
//! flush destructions, apply moves, rehash dynamic, rehash static if dirty.
//! Gameplay code runs between ticks and only submits spawns, despawns and
//! moves; none of them reach the spatial index before the next
//! [`Simulation::tick`].

use crate::config::WorldConfig;
use crate::error::{HandleError, SimError};
use crate::handle::{Category, DestroyQueue, Handle, HandleTable};
use crate::world::{Mobility, TickReport, World};
use glam::Vec3;
use tether_metrics::{time_phase, PhaseProfiler, TickTimer};

/// What a call to [`Simulation::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimTickReport {
    /// Slots recycled by this tick's flush.
    pub released: usize,
    pub world: TickReport,
}

pub struct Simulation<T, C: Category> {
    objects: HandleTable<T, C>,
    world: World,
    /// Handles released by the current flush, reused across ticks.
    freed: Vec<Handle>,
    timer: TickTimer,
    profiler: PhaseProfiler,
}

impl<T, C: Category> Simulation<T, C> {
    /// Samples averaged by the tick timer and flush profiler.
    const METRICS_WINDOW: usize = 120;

    pub fn new(config: &WorldConfig) -> Self {
        let world = World::new(config);
        // A tick slower than the simulated step cannot keep real time.
        let mut timer = TickTimer::new(Self::METRICS_WINDOW);
        timer.set_budget(world.time().tick_duration());
        Self {
            objects: HandleTable::new(),
            world,
            freed: Vec::new(),
            timer,
            profiler: PhaseProfiler::new(Self::METRICS_WINDOW),
        }
    }

    /// Admit an object at `position`; it becomes queryable after the next tick.
    pub fn spawn(&mut self, category: C, object: T, position: Vec3, mobility: Mobility) -> Handle {
        let handle = self.objects.allocate(category, object);
        self.world.insert(handle.index(), position, mobility);
        handle
    }

    /// Destroy the object behind `handle` at the end of the tick.
    ///
    /// Returns `false` if the handle was already stale.
    pub fn despawn(&mut self, handle: Handle) -> bool {
        self.objects.destroy(handle)
    }

    /// Buffer a move for a live dynamic object.
    pub fn mark_moved(&mut self, handle: Handle, position: Vec3) -> Result<(), SimError> {
        if !self.objects.is_valid(handle) {
            return Err(HandleError::InvalidHandle { handle }.into());
        }
        self.world.mark_moved(handle.index(), position)?;
        Ok(())
    }

    /// Advance one tick.
    ///
    /// Every released slot is removed from the world before the grids are
    /// rebuilt, whether or not earlier removals found their id.
    pub fn tick(&mut self) -> Result<SimTickReport, SimError> {
        self.timer.begin();

        let objects = &mut self.objects;
        let freed = &mut self.freed;
        let released = time_phase!(self.profiler, "flush", {
            objects.flush_destructions_with(|handle, _object| freed.push(handle))
        });
        for handle in self.freed.drain(..) {
            if let Err(err) = self.world.remove(handle.index()) {
                tracing::warn!(%handle, error = %err, "released object was not in the world");
            }
        }

        let world = self.world.tick();
        self.timer.end();
        let world = world?;

        if released > 0 {
            tracing::debug!(tick = world.tick, released, "recycled slots");
        }
        Ok(SimTickReport { released, world })
    }

    /// Collect ids of live objects within `radius` of `position` into `out`.
    ///
    /// Results come from the grids as of the last tick. Ids of objects
    /// destroyed since then are skipped during the scan and take no room in
    /// `out`, so a return value equal to `out.len()` still signals
    /// truncation. Use [`HandleTable::handle_at`] on
    /// [`objects`](Self::objects) to turn the ids into handles.
    pub fn query_nearby(
        &self,
        position: Vec3,
        radius: f32,
        out: &mut [u32],
        include_static: bool,
    ) -> usize {
        let objects = &self.objects;
        self.world
            .query_nearby_filtered(position, radius, out, include_static, |id| {
                objects.handle_at(id).is_some()
            })
    }

    pub fn resolve(&self, handle: Handle) -> Option<&T> {
        self.objects.resolve(handle)
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.objects.resolve_mut(handle)
    }

    pub fn objects(&self) -> &HandleTable<T, C> {
        &self.objects
    }

    /// Visit every live object of `category` mutably; see
    /// [`HandleTable::for_each_in_category_mut`].
    pub fn for_each_in_category_mut<F>(&mut self, category: C, visit: F) -> usize
    where
        F: FnMut(Handle, &mut T, &mut DestroyQueue),
    {
        self.objects.for_each_in_category_mut(category, visit)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn tick_timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }
}
