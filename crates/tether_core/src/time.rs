//! Deterministic simulated time
//!
//! Time only moves when the world ticks. Every tick advances the clock by a
//! fixed step derived from the configured tick rate, so elapsed time is a
//! pure function of the tick count and never drifts.

use std::time::Duration;

/// Default simulation tick rate.
pub const TICK_RATE_HZ: u32 = 60;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Tick counter with a fixed step per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTime {
    tick_count: u64,
    tick_rate_hz: u32,
    step_nanos: u64,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::with_tick_rate(TICK_RATE_HZ)
    }

    /// Clock stepping `1 / tick_rate_hz` seconds per tick. A rate of zero is
    /// treated as one tick per second.
    pub fn with_tick_rate(tick_rate_hz: u32) -> Self {
        let tick_rate_hz = tick_rate_hz.max(1);
        Self {
            tick_count: 0,
            tick_rate_hz,
            step_nanos: NANOS_PER_SEC / tick_rate_hz as u64,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// Simulated time covered by one tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_nanos(self.step_nanos)
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
    }

    /// Simulated time elapsed after `tick` ticks.
    pub fn time_at(&self, tick: u64) -> Duration {
        Duration::from_nanos(self.step_nanos.saturating_mul(tick))
    }

    pub fn total_time(&self) -> Duration {
        self.time_at(self.tick_count)
    }

    /// Whole ticks needed to cover `span`, rounded up.
    pub fn ticks_for(&self, span: Duration) -> u64 {
        let nanos = u64::try_from(span.as_nanos()).unwrap_or(u64::MAX);
        nanos.div_ceil(self.step_nanos)
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}
