//! Counting-sort spatial hash grid.

use super::cell::{bucket_of, cell_of};
use crate::config::GridConfig;
use crate::error::GridError;
use crate::pool::SlotMap;
use glam::{IVec3, Vec3};
use std::cell::Cell;

/// Entry in the bucket-sorted entity table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridEntry {
    pub id: u32,
    pub position: Vec3,
}

/// Counters accumulated by a grid since creation or the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridStats {
    pub rehashes: u64,
    pub queries: u64,
    /// Entries whose position was tested against a query sphere.
    pub candidates: u64,
    pub hits: u64,
    /// Queries that stopped because the output buffer filled up.
    pub truncated: u64,
    /// Queries answered by scanning the whole entity table.
    pub linear_scans: u64,
}

/// Spatial hash grid over a set of `u32` ids.
///
/// Mutations (`insert`, `remove`, `update_position`) only touch the position
/// table. Queries read the bucket arrays, which reflect the positions as of
/// the last [`rehash`](Self::rehash).
pub struct SpatialHashGrid {
    spacing: f32,
    min_buckets: usize,
    positions: SlotMap<Vec3>,
    /// `cell_count[b]..cell_count[b + 1]` is bucket `b`'s range in `entity_table`.
    cell_count: Vec<u32>,
    entity_table: Vec<GridEntry>,
    /// Entries of `entity_table` written by the last rehash.
    indexed: usize,
    stale: bool,
    stats: Cell<GridStats>,
}

impl SpatialHashGrid {
    pub fn new(config: &GridConfig) -> Self {
        let spacing = if config.cell_spacing.is_finite() && config.cell_spacing > 0.0 {
            config.cell_spacing
        } else {
            tracing::warn!(
                cell_spacing = config.cell_spacing,
                "invalid cell spacing, falling back to 1.0"
            );
            1.0
        };
        let min_buckets = (config.min_buckets as usize).max(1);
        let capacity = config.initial_capacity as usize;
        let bucket_count = capacity.max(min_buckets);

        Self {
            spacing,
            min_buckets,
            positions: SlotMap::with_capacity(capacity),
            cell_count: vec![0; bucket_count + 1],
            entity_table: vec![GridEntry::default(); capacity],
            indexed: 0,
            stale: false,
            stats: Cell::new(GridStats::default()),
        }
    }

    /// Track `id` at `position`, replacing any previous position.
    pub fn insert(&mut self, id: u32, position: Vec3) -> Option<Vec3> {
        self.stale = true;
        self.positions.insert(id, position)
    }

    /// Stop tracking `id`, returning its last position.
    pub fn remove(&mut self, id: u32) -> Result<Vec3, GridError> {
        let position = self.positions.remove(id).ok_or(GridError::NotFound { id })?;
        self.stale = true;
        Ok(position)
    }

    pub fn update_position(&mut self, id: u32, position: Vec3) -> Result<(), GridError> {
        let slot = self
            .positions
            .get_mut(id)
            .ok_or(GridError::NotFound { id })?;
        *slot = position;
        self.stale = true;
        Ok(())
    }

    /// Rebuild the bucket arrays from the position table.
    ///
    /// Two passes over membership: the first counts entries per bucket, the
    /// second places each entry by decrementing its bucket's running end
    /// offset. Afterwards `cell_count` holds each bucket's start offset and
    /// `cell_count[bucket_count]` holds the member count.
    pub fn rehash(&mut self) {
        let members = self.positions.len();
        if members > self.entity_table.len() {
            self.entity_table.resize(members, GridEntry::default());
            let bucket_count = members.max(self.min_buckets);
            self.cell_count.resize(bucket_count + 1, 0);
            tracing::debug!(members, bucket_count, "spatial grid grew");
        }

        let bucket_count = self.cell_count.len() - 1;
        self.cell_count.fill(0);

        for (_, &position) in self.positions.iter() {
            let bucket = bucket_of(cell_of(position, self.spacing), bucket_count);
            self.cell_count[bucket] += 1;
        }

        // Running end offset of every bucket.
        let mut running = 0u32;
        for count in &mut self.cell_count[..bucket_count] {
            running += *count;
            *count = running;
        }
        self.cell_count[bucket_count] = running;

        for (id, &position) in self.positions.iter() {
            let bucket = bucket_of(cell_of(position, self.spacing), bucket_count);
            self.cell_count[bucket] -= 1;
            self.entity_table[self.cell_count[bucket] as usize] = GridEntry { id, position };
        }

        self.indexed = members;
        self.stale = false;

        let mut stats = self.stats.get();
        stats.rehashes += 1;
        self.stats.set(stats);
    }

    /// Write ids within `radius` of `position` into `out[start_offset..]`.
    ///
    /// Returns the offset one past the last id written. The result is
    /// truncated (and equals `out.len()`) when the buffer fills up, so
    /// callers must not treat a full buffer as an exhaustive answer. Order
    /// of results is unspecified.
    pub fn query(&self, position: Vec3, radius: f32, out: &mut [u32], start_offset: usize) -> usize {
        self.query_filtered(position, radius, out, start_offset, |_| true)
    }

    /// [`query`](Self::query) that only reports ids accepted by `keep`.
    ///
    /// Rejected ids never occupy a slot of `out`, so a full buffer still
    /// means the answer was cut short.
    pub fn query_filtered<F>(
        &self,
        position: Vec3,
        radius: f32,
        out: &mut [u32],
        start_offset: usize,
        keep: F,
    ) -> usize
    where
        F: Fn(u32) -> bool,
    {
        let mut count = start_offset.min(out.len());
        let mut stats = self.stats.get();
        stats.queries += 1;

        // Negated form also rejects a NaN radius.
        if self.indexed == 0 || count == out.len() || !(radius >= 0.0) {
            self.stats.set(stats);
            return count;
        }

        let r2 = radius * radius;
        let lo = cell_of(position - Vec3::splat(radius), self.spacing);
        let hi = cell_of(position + Vec3::splat(radius), self.spacing);

        if Self::cells_in_box(lo, hi) > self.indexed as u64 {
            stats.linear_scans += 1;
            for entry in &self.entity_table[..self.indexed] {
                stats.candidates += 1;
                if entry.position.distance_squared(position) <= r2 && keep(entry.id) {
                    if count == out.len() {
                        stats.truncated += 1;
                        self.stats.set(stats);
                        return count;
                    }
                    out[count] = entry.id;
                    count += 1;
                    stats.hits += 1;
                }
            }
            self.stats.set(stats);
            return count;
        }

        let bucket_count = self.cell_count.len() - 1;
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let cell = IVec3::new(x, y, z);
                    let bucket = bucket_of(cell, bucket_count);
                    let start = self.cell_count[bucket] as usize;
                    let end = self.cell_count[bucket + 1] as usize;

                    for entry in &self.entity_table[start..end] {
                        // Another cell hashed into this bucket; it is visited on its own turn.
                        if cell_of(entry.position, self.spacing) != cell {
                            continue;
                        }
                        stats.candidates += 1;
                        if entry.position.distance_squared(position) <= r2 && keep(entry.id) {
                            if count == out.len() {
                                stats.truncated += 1;
                                self.stats.set(stats);
                                return count;
                            }
                            out[count] = entry.id;
                            count += 1;
                            stats.hits += 1;
                        }
                    }
                }
            }
        }

        self.stats.set(stats);
        count
    }

    fn cells_in_box(lo: IVec3, hi: IVec3) -> u64 {
        let extent = |a: i32, b: i32| (b as i64 - a as i64 + 1).max(0) as u64;
        extent(lo.x, hi.x)
            .saturating_mul(extent(lo.y, hi.y))
            .saturating_mul(extent(lo.z, hi.z))
    }

    /// Number of tracked ids (including changes not yet rehashed).
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of entries visible to queries.
    pub fn indexed_len(&self) -> usize {
        self.indexed
    }

    pub fn contains(&self, id: u32) -> bool {
        self.positions.contains(id)
    }

    /// Current (possibly not yet rehashed) position of `id`.
    pub fn position(&self, id: u32) -> Option<Vec3> {
        self.positions.get(id).copied()
    }

    /// `true` if membership or positions changed since the last rehash.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn cell_spacing(&self) -> f32 {
        self.spacing
    }

    pub fn bucket_count(&self) -> usize {
        self.cell_count.len() - 1
    }

    /// Entries placed in bucket `bucket` by the last rehash.
    pub fn bucket(&self, bucket: usize) -> &[GridEntry] {
        if bucket >= self.bucket_count() {
            return &[];
        }
        let start = self.cell_count[bucket] as usize;
        let end = self.cell_count[bucket + 1] as usize;
        &self.entity_table[start..end]
    }

    /// Drop all members and indexed entries, keeping allocations.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.cell_count.fill(0);
        self.indexed = 0;
        self.stale = false;
    }

    pub fn stats(&self) -> GridStats {
        self.stats.get()
    }

    pub fn reset_stats(&self) {
        self.stats.set(GridStats::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(spacing: f32) -> SpatialHashGrid {
        SpatialHashGrid::new(&GridConfig {
            cell_spacing: spacing,
            min_buckets: 8,
            initial_capacity: 4,
        })
    }

    /// Park `count` ids far from the origin so small queries take the bucket path.
    fn fill_far(g: &mut SpatialHashGrid, first_id: u32, count: u32) {
        for i in 0..count {
            g.insert(first_id + i, Vec3::new(1000.0 + i as f32 * 3.0, 0.0, 0.0));
        }
    }

    fn sorted(mut ids: Vec<u32>) -> Vec<u32> {
        ids.sort_unstable();
        ids
    }

    #[test]
    fn radius_query_excludes_far_ids() {
        let mut g = grid(1.0);
        g.insert(1, Vec3::new(0.0, 0.0, 0.0));
        g.insert(2, Vec3::new(1.0, 0.0, 0.0));
        g.insert(3, Vec3::new(10.0, 0.0, 0.0));
        fill_far(&mut g, 100, 80);
        g.rehash();

        let mut buf = [0u32; 8];
        let n = g.query(Vec3::ZERO, 1.5, &mut buf, 0);
        assert_eq!(sorted(buf[..n].to_vec()), vec![1, 2]);
    }

    #[test]
    fn query_matches_brute_force_around_origin() {
        let mut g = grid(2.0);
        let mut points = Vec::new();
        let mut id = 0;
        for x in -6..=6 {
            for y in -3..=3 {
                for z in -2..=2 {
                    let p = Vec3::new(x as f32 * 0.9, y as f32 * 1.3, z as f32 * -0.7);
                    g.insert(id, p);
                    points.push((id, p));
                    id += 1;
                }
            }
        }
        g.rehash();

        let mut buf = vec![0u32; points.len()];
        for (center, radius) in [
            (Vec3::ZERO, 2.5),
            (Vec3::new(-3.3, 1.1, 0.4), 1.7),
            (Vec3::new(4.95, -2.0, -1.0), 3.1),
            (Vec3::new(-0.01, -0.01, -0.01), 0.5),
        ] {
            let n = g.query(center, radius, &mut buf, 0);
            let expected: Vec<u32> = points
                .iter()
                .filter(|(_, p)| p.distance_squared(center) <= radius * radius)
                .map(|(id, _)| *id)
                .collect();
            assert_eq!(sorted(buf[..n].to_vec()), sorted(expected), "center {center}");
        }
    }

    #[test]
    fn dense_query_visits_each_cell_once() {
        let mut g = grid(1.0);
        for id in 0..40 {
            g.insert(id, Vec3::new(id as f32 * 0.25, 0.0, 0.0));
        }
        g.rehash();
        assert_eq!(g.bucket_count(), 40);

        // 27-cell box over 40 members takes the bucket path.
        let mut buf = [0u32; 64];
        let n = g.query(Vec3::new(5.0, 0.0, 0.0), 1.0, &mut buf, 0);
        assert_eq!(sorted(buf[..n].to_vec()), (16..=24).collect::<Vec<_>>());
        assert_eq!(g.stats().linear_scans, 0);
    }

    #[test]
    fn undersized_buffer_truncates_at_capacity() {
        let mut g = grid(1.0);
        for id in 0..20 {
            g.insert(id, Vec3::new(0.1 * id as f32, 0.0, 0.0));
        }
        g.rehash();

        let mut buf = [u32::MAX; 5];
        let n = g.query(Vec3::ZERO, 100.0, &mut buf, 0);
        assert_eq!(n, buf.len());
        assert!(buf.iter().all(|&id| id < 20));
        assert_eq!(g.stats().truncated, 1);
    }

    #[test]
    fn start_offset_appends_after_existing_results() {
        let mut g = grid(1.0);
        g.insert(7, Vec3::ZERO);
        g.rehash();

        let mut buf = [99u32; 4];
        let n = g.query(Vec3::ZERO, 0.0, &mut buf, 2);
        assert_eq!(n, 3);
        assert_eq!(buf, [99, 99, 7, 99]);

        // Offset past the end is clamped and writes nothing.
        assert_eq!(g.query(Vec3::ZERO, 1.0, &mut buf, 10), 4);
    }

    #[test]
    fn mutations_are_invisible_until_rehash() {
        let mut g = grid(1.0);
        g.insert(1, Vec3::ZERO);
        g.rehash();

        g.update_position(1, Vec3::new(50.0, 0.0, 0.0)).unwrap();
        g.insert(2, Vec3::ZERO);
        assert!(g.is_stale());

        let mut buf = [0u32; 4];
        let n = g.query(Vec3::ZERO, 0.5, &mut buf, 0);
        assert_eq!(&buf[..n], &[1]);

        g.rehash();
        let n = g.query(Vec3::ZERO, 0.5, &mut buf, 0);
        assert_eq!(&buf[..n], &[2]);
        assert!(!g.is_stale());
    }

    #[test]
    fn absent_ids_are_reported() {
        let mut g = grid(1.0);
        assert_eq!(
            g.update_position(4, Vec3::ONE),
            Err(GridError::NotFound { id: 4 })
        );
        assert_eq!(g.remove(4), Err(GridError::NotFound { id: 4 }));

        g.insert(4, Vec3::ONE);
        assert_eq!(g.remove(4), Ok(Vec3::ONE));
        assert!(g.is_empty());
    }

    #[test]
    fn rehash_twice_keeps_bucket_membership() {
        let mut g = grid(0.75);
        for id in 0..64u32 {
            let f = id as f32;
            g.insert(id, Vec3::new(f.sin() * 9.0, f.cos() * 4.0, -f * 0.3));
        }
        g.rehash();
        let before: Vec<Vec<u32>> = (0..g.bucket_count())
            .map(|b| sorted(g.bucket(b).iter().map(|e| e.id).collect()))
            .collect();

        g.rehash();
        let after: Vec<Vec<u32>> = (0..g.bucket_count())
            .map(|b| sorted(g.bucket(b).iter().map(|e| e.id).collect()))
            .collect();
        assert_eq!(before, after);
        assert_eq!(before.iter().map(Vec::len).sum::<usize>(), 64);
    }

    #[test]
    fn huge_radius_falls_back_to_linear_scan() {
        let mut g = grid(1.0);
        g.insert(1, Vec3::new(-1.0e6, 0.0, 0.0));
        g.insert(2, Vec3::new(1.0e6, 0.0, 0.0));
        g.rehash();

        let mut buf = [0u32; 4];
        let n = g.query(Vec3::ZERO, f32::INFINITY, &mut buf, 0);
        assert_eq!(sorted(buf[..n].to_vec()), vec![1, 2]);
        assert_eq!(g.stats().linear_scans, 1);

        assert_eq!(g.query(Vec3::ZERO, f32::NAN, &mut buf, 0), 0);
        assert_eq!(g.query(Vec3::ZERO, -1.0, &mut buf, 0), 0);
    }

    #[test]
    fn negative_space_queries_find_neighbours() {
        let mut g = grid(1.0);
        g.insert(1, Vec3::new(-0.6, -0.6, -0.6));
        g.insert(2, Vec3::new(0.7, 0.0, 0.0));
        g.insert(3, Vec3::new(-2.4, 0.0, 0.0));
        fill_far(&mut g, 100, 80);
        g.rehash();

        let mut buf = [0u32; 4];
        let n = g.query(Vec3::new(-0.1, 0.0, 0.0), 1.2, &mut buf, 0);
        assert_eq!(sorted(buf[..n].to_vec()), vec![1, 2]);
        assert_eq!(g.stats().linear_scans, 0);
    }

    #[test]
    fn filtered_ids_do_not_consume_buffer() {
        let mut g = grid(1.0);
        for id in 1..=4 {
            g.insert(id, Vec3::new(0.1 * id as f32, 0.0, 0.0));
        }
        fill_far(&mut g, 100, 80);
        g.rehash();

        let mut buf = [0u32; 2];
        let n = g.query_filtered(Vec3::ZERO, 1.0, &mut buf, 0, |id| id % 2 == 0);
        assert_eq!(n, 2);
        assert_eq!(sorted(buf.to_vec()), vec![2, 4]);
        assert_eq!(g.stats().truncated, 0);

        // Only three ids pass; a two-slot buffer is reported as truncated.
        let n = g.query_filtered(Vec3::ZERO, 1.0, &mut buf, 0, |id| id != 1);
        assert_eq!(n, buf.len());
        assert_eq!(g.stats().truncated, 1);
    }
}
