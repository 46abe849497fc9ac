//! Deterministic math utilities
//!
//! Re-exports glam with additional deterministic utilities

pub use glam::*;

/// Deterministic random number generator (xorshift64*)
///
/// Same seed, same sequence on every platform. Used to scatter and move
/// populations reproducibly in tests and the headless runtime.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    seed: u64,
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        // xorshift never leaves the all-zero state.
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { seed, state }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform in `[lo, hi)`.
    pub fn next_range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Uniform point in the cube `[-extent, extent)^3`.
    pub fn next_in_cube(&mut self, extent: f32) -> Vec3 {
        Vec3::new(
            self.next_range(-extent, extent),
            self.next_range(-extent, extent),
            self.next_range(-extent, extent),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = DeterministicRng::new(42);
        let mut b = DeterministicRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn floats_stay_in_range() {
        let mut rng = DeterministicRng::new(0);
        for _ in 0..1_000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f));
            let p = rng.next_in_cube(5.0);
            assert!(p.abs().max_element() <= 5.0);
        }
    }
}
