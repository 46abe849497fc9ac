//! Cell discretisation and the bucket hash.

use glam::{IVec3, Vec3};

/// Large odd multipliers decorrelating the three axes.
const P1: i64 = 73_856_093;
const P2: i64 = 19_349_663;
const P3: i64 = 83_492_791;

/// Integer cell containing `position`: `floor(coord / spacing)` per axis.
///
/// Coordinates beyond the `i32` range saturate.
#[inline]
pub(crate) fn cell_of(position: Vec3, spacing: f32) -> IVec3 {
    (position / spacing).floor().as_ivec3()
}

/// Bucket index of `cell` in a table of `bucket_count` buckets.
///
/// Distant cells may share a bucket; queries filter those out.
#[inline]
pub(crate) fn bucket_of(cell: IVec3, bucket_count: usize) -> usize {
    let h = (cell.x as i64).wrapping_mul(P1)
        ^ (cell.y as i64).wrapping_mul(P2)
        ^ (cell.z as i64).wrapping_mul(P3);
    (h.unsigned_abs() % bucket_count as u64) as usize
}
