//! Wall-clock cost of simulation ticks, measured against a per-tick budget

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

pub struct TickTimer {
    started: Option<Instant>,
    window: RingBuffer<Duration>,
    ticks: u64,
    worst: Duration,
    /// Wall-clock time a tick may take before it counts as an overrun.
    budget: Option<Duration>,
    overruns: u64,
}

impl TickTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            started: None,
            window: RingBuffer::new(capacity),
            ticks: 0,
            worst: Duration::ZERO,
            budget: None,
            overruns: 0,
        }
    }

    pub fn set_budget(&mut self, budget: Duration) {
        self.budget = Some(budget);
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the tick opened by [`begin`](Self::begin) and return its cost.
    ///
    /// Without a matching `begin` nothing is recorded.
    pub fn end(&mut self) -> Duration {
        let Some(started) = self.started.take() else {
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        self.record(elapsed);
        elapsed
    }

    fn record(&mut self, elapsed: Duration) {
        self.window.push(elapsed);
        self.ticks += 1;
        self.worst = self.worst.max(elapsed);
        if self.budget.is_some_and(|budget| elapsed > budget) {
            self.overruns += 1;
        }
    }

    /// Ticks recorded since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks that exceeded the budget since creation.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Ticks per second the simulation could sustain at the current average cost.
    pub fn ticks_per_second(&self) -> f64 {
        let avg = self.window.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn last_tick_ms(&self) -> f64 {
        self.window.latest().unwrap_or_default().as_secs_f64() * 1000.0
    }

    /// Average over the rolling window.
    pub fn tick_time_ms(&self) -> f64 {
        self.window.average().as_secs_f64() * 1000.0
    }

    /// Fastest and slowest tick in the rolling window.
    pub fn tick_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.window.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    /// Slowest tick since creation.
    pub fn worst_tick_ms(&self) -> f64 {
        self.worst.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_without_begin_records_nothing() {
        let mut timer = TickTimer::new(4);
        assert_eq!(timer.end(), Duration::ZERO);
        assert_eq!(timer.ticks(), 0);

        timer.begin();
        timer.end();
        timer.end();
        assert_eq!(timer.ticks(), 1);
    }

    #[test]
    fn worst_tick_outlives_the_window() {
        let mut timer = TickTimer::new(2);
        timer.set_budget(Duration::from_millis(5));
        for ms in [9, 1, 2, 3] {
            timer.record(Duration::from_millis(ms));
        }

        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert_eq!(timer.ticks(), 4);
        assert_eq!(timer.overruns(), 1);
        assert!(close(timer.worst_tick_ms(), 9.0));
        assert!(close(timer.last_tick_ms(), 3.0));
        let (min, max) = timer.tick_time_range_ms();
        assert!(close(min, 2.0) && close(max, 3.0));
        assert!(close(timer.tick_time_ms(), 2.5));
    }
}
