//! Fast-forward replay.
//!
//! Drives a simulation through virtual time without sleeping. The timer
//! queue makes the run independent of the step size, so a replay of a
//! config from a given start is reproducible bit for bit.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chaosfeed_core::domain::TimestampMs;
use chaosfeed_core::scheduler::SchedulerTransition;
use chaosfeed_core::{ControlStore, SimEvent, Simulation, SimulationConfig, Status};

/// Current schema version for persisted replay reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Virtual time advanced per driver step.
const STEP_MS: i64 = 1_000;

/// Summary of one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Content hash of the config that produced the run.
    pub fingerprint: String,
    pub seed: u64,
    pub start: TimestampMs,
    pub end: TimestampMs,
    /// Emitted events by kind.
    pub event_counts: BTreeMap<String, usize>,
    /// Every scheduler transition, in order.
    pub transitions: Vec<(TimestampMs, SchedulerTransition)>,
    pub status: Status,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Replay `duration_ms` of simulated time from `start`.
///
/// Returns the report and the simulation in its final state, for export.
pub fn replay(
    config: SimulationConfig,
    start: TimestampMs,
    duration_ms: i64,
    store: Option<Box<dyn ControlStore>>,
) -> Result<(ReplayReport, Simulation)> {
    let fingerprint = config.fingerprint();
    let seed = config.seed;
    let mut sim = match store {
        Some(store) => Simulation::with_store(config, start, store),
        None => Simulation::new(config, start),
    }
    .context("invalid simulation config")?;

    let end = start + duration_ms.max(0);
    let mut event_counts = BTreeMap::new();
    let mut transitions = Vec::new();
    let mut t = start;
    while t < end {
        t = (t + STEP_MS).min(end);
        for emitted in sim.advance_to(t) {
            *event_counts
                .entry(emitted.event.kind().to_string())
                .or_insert(0) += 1;
            if let SimEvent::Scheduler(transition) = emitted.event {
                transitions.push((emitted.at, transition));
            }
        }
    }

    tracing::info!(
        %fingerprint,
        start,
        end,
        events = event_counts.values().sum::<usize>(),
        "replay finished"
    );

    let report = ReplayReport {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        seed,
        start,
        end,
        event_counts,
        transitions,
        status: sim.status(),
    };
    Ok((report, sim))
}
