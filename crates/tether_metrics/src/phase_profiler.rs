//! Per-phase timings for the fixed tick order (flush, moves, rehash, ...)

use super::ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct PhaseProfiler {
    window: usize,
    phases: HashMap<&'static str, RingBuffer<Duration>>,
}

impl PhaseProfiler {
    /// `window` is the number of most recent samples averaged per phase.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            phases: HashMap::new(),
        }
    }

    pub fn time_phase<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let window = self.window;
        self.phases
            .entry(name)
            .or_insert_with(|| RingBuffer::new(window))
            .push(elapsed);
        result
    }

    pub fn last(&self, name: &'static str) -> Duration {
        self.phases
            .get(name)
            .and_then(|samples| samples.latest())
            .unwrap_or(Duration::ZERO)
    }

    pub fn average(&self, name: &'static str) -> Duration {
        self.phases
            .get(name)
            .map(|samples| samples.average())
            .unwrap_or(Duration::ZERO)
    }

    pub fn reset(&mut self) {
        self.phases.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.phases
            .iter()
            .map(|(name, samples)| (*name, samples.average()))
    }
}

impl Default for PhaseProfiler {
    fn default() -> Self {
        Self::new(60)
    }
}
