//! Tether Metrics - Tick profiling for the simulation core
//!
//! Provides zero-cost abstractions for metrics collection that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tether_metrics::{PhaseProfiler, TickTimer};
//!
//! let mut timer = TickTimer::new(60); // Track last 60 ticks
//! let mut phases = PhaseProfiler::new(60);
//! timer.begin();
//! phases.time_phase("rehash_dynamic", || grid.rehash());
//! timer.end();
//! println!("tick: {:.3} ms", timer.tick_time_ms());
//! ```
//!
//! In production builds (without `metrics` feature), all instrumentation
//! is compiled out to zero overhead.

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod phase_profiler;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod tick_timer;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use phase_profiler::PhaseProfiler;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use tick_timer::TickTimer;

// ============================================================================
// Macros
// ============================================================================

/// Time a named phase.
///
/// Expands to a plain call on the profiler; the disabled-feature stub runs
/// the body directly, so the wrapper costs nothing in production builds.
#[macro_export]
macro_rules! time_phase {
    ($profiler:expr, $name:expr, $body:block) => {
        $profiler.time_phase($name, || $body)
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn set_budget(&mut self, _budget: std::time::Duration) {}
    pub fn begin(&mut self) {}
    pub fn end(&mut self) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn ticks(&self) -> u64 { 0 }
    pub fn overruns(&self) -> u64 { 0 }
    pub fn ticks_per_second(&self) -> f64 { 0.0 }
    pub fn last_tick_ms(&self) -> f64 { 0.0 }
    pub fn tick_time_ms(&self) -> f64 { 0.0 }
    pub fn tick_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn worst_tick_ms(&self) -> f64 { 0.0 }
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _value: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
}

#[cfg(not(feature = "metrics"))]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: u64) {}
    pub fn set(&mut self, _name: &'static str, _value: u64) {}
    pub fn get(&self, _name: &'static str) -> u64 { 0 }
    pub fn reset_all(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
pub struct PhaseProfiler;

#[cfg(not(feature = "metrics"))]
impl PhaseProfiler {
    pub fn new(_window: usize) -> Self { Self }
    pub fn time_phase<F, R>(&mut self, _name: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn last(&self, _name: &'static str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn average(&self, _name: &'static str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    #[test]
    fn stubs_and_real_types_share_an_api() {
        let mut timer = super::TickTimer::new(60);
        timer.begin();
        let _ = timer.end();
        let _ = timer.tick_time_ms();
        let _ = timer.worst_tick_ms();

        let mut counter = super::Counter::new();
        counter.increment("queries", 3);
        let _ = counter.get("queries");

        let mut profiler = super::PhaseProfiler::new(8);
        let value = profiler.time_phase("work", || 41 + 1);
        assert_eq!(value, 42);
    }

    #[test]
    fn time_phase_macro_returns_body_value() {
        let mut profiler = super::PhaseProfiler::new(4);
        let value = time_phase!(profiler, "macro", { 7 * 6 });
        assert_eq!(value, 42);
    }
}
