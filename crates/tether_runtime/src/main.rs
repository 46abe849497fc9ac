//! Tether Runtime
//!
//! Headless binary that boots the simulation core and drives a synthetic
//! population through the per-tick loop.
//!
//! Usage: `tether [config.json]`

use anyhow::{Context, Result};
use serde::Serialize;
use tether_core::glam::Vec3;
use tether_core::math::DeterministicRng;
use tether_core::{Handle, Mobility, RuntimeConfig, Simulation};
use tether_metrics::Counter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    Drone,
    Pylon,
}

/// Per-object payload; stands in for gameplay state.
#[derive(Debug)]
struct Body {
    velocity: Vec3,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    ticks: u64,
    live_objects: usize,
    slots: usize,
    queries: u64,
    neighbours_found: u64,
    truncated_queries: u64,
    simulated_secs: f64,
    avg_tick_ms: f64,
    worst_tick_ms: f64,
    /// Ticks that took longer in wall-clock time than the simulated step.
    overrun_ticks: u64,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Tether Engine v{}", tether_core::VERSION);

    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(&path)
            .with_context(|| format!("loading runtime config from {path}"))?,
        None => RuntimeConfig::default(),
    };
    tracing::info!("Config: {}", serde_json::to_string(&config)?);

    let summary = run(&config)?;
    tracing::info!("Summary: {}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run(config: &RuntimeConfig) -> Result<RunSummary> {
    let mut rng = DeterministicRng::new(config.seed);
    let mut sim: Simulation<Body, Kind> = Simulation::new(&config.world);
    let extent = config.world_extent;

    for _ in 0..config.static_population {
        let body = Body { velocity: Vec3::ZERO };
        sim.spawn(Kind::Pylon, body, rng.next_in_cube(extent), Mobility::Static);
    }
    let mut drones: Vec<Handle> = (0..config.population)
        .map(|_| spawn_drone(&mut sim, &mut rng, extent))
        .collect();
    sim.tick()?;
    tracing::info!(
        drones = drones.len(),
        pylons = config.static_population,
        "Population spawned"
    );

    let mut counters = Counter::new();
    let mut neighbours = vec![0u32; config.query_capacity as usize];

    for _ in 0..config.ticks {
        // Behaviour: integrate, bounce off the bounds, occasionally churn.
        let mut next = Vec::with_capacity(drones.len());
        for handle in drones.drain(..) {
            if rng.next_f32() < config.churn {
                sim.despawn(handle);
                next.push(spawn_drone(&mut sim, &mut rng, extent));
                continue;
            }

            let Some(position) = sim.world().position_of(handle.index()) else {
                continue;
            };
            let Some(body) = sim.resolve_mut(handle) else {
                continue;
            };
            let mut moved = position + body.velocity;
            for axis in 0..3 {
                if moved[axis].abs() > extent {
                    body.velocity[axis] = -body.velocity[axis];
                    moved[axis] = moved[axis].clamp(-extent, extent);
                }
            }
            sim.mark_moved(handle, moved)?;
            next.push(handle);
        }
        drones = next;

        let report = sim.tick()?;

        // Queries: every drone looks around its fresh position.
        for &handle in &drones {
            let Some(position) = sim.world().position_of(handle.index()) else {
                continue;
            };
            let found = sim.query_nearby(position, config.query_radius, &mut neighbours, true);
            counters.increment("queries", 1);
            counters.increment("neighbours", found as u64);
            if found == neighbours.len() {
                counters.increment("truncated", 1);
            }
        }

        if report.world.tick % config.report_interval as u64 == 0 {
            let dynamic = sim.world().dynamic_grid().stats();
            let (fastest_ms, slowest_ms) = sim.tick_timer().tick_time_range_ms();
            tracing::info!(
                tick = report.world.tick,
                live = sim.objects().len(),
                released = report.released,
                static_rehashed = report.world.static_rehashed,
                avg_tick_ms = sim.tick_timer().tick_time_ms(),
                fastest_ms,
                slowest_ms,
                rehash_dynamic_us = sim.world().profiler().average("rehash_dynamic").as_micros() as u64,
                candidates = dynamic.candidates,
                hits = dynamic.hits,
                "Tick report"
            );
        }
    }

    Ok(RunSummary {
        ticks: sim.world().tick_count(),
        live_objects: sim.objects().len(),
        slots: sim.objects().slot_count(),
        queries: counters.get("queries"),
        neighbours_found: counters.get("neighbours"),
        truncated_queries: counters.get("truncated"),
        simulated_secs: sim.world().time().total_time().as_secs_f64(),
        avg_tick_ms: sim.tick_timer().tick_time_ms(),
        worst_tick_ms: sim.tick_timer().worst_tick_ms(),
        overrun_ticks: sim.tick_timer().overruns(),
    })
}

fn spawn_drone(sim: &mut Simulation<Body, Kind>, rng: &mut DeterministicRng, extent: f32) -> Handle {
    let body = Body {
        velocity: rng.next_in_cube(1.0),
    };
    sim.spawn(Kind::Drone, body, rng.next_in_cube(extent), Mobility::Dynamic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_run_keeps_population_constant() {
        let config = RuntimeConfig {
            population: 40,
            static_population: 10,
            ticks: 12,
            world_extent: 20.0,
            churn: 0.1,
            report_interval: 5,
            ..RuntimeConfig::default()
        };
        let summary = run(&config).unwrap();
        assert_eq!(summary.ticks, 13);
        assert_eq!(summary.live_objects, 50);
        assert_eq!(summary.queries, 40 * 12);
    }
}
