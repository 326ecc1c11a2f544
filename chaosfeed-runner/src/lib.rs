//! chaosfeed runner: everything around the pure engine that touches the
//! outside world.
//!
//! This crate builds on `chaosfeed-core` to provide:
//! - TOML configuration loading
//! - A JSON-file control store and operator commands against it
//! - A real-time tokio driver with signal teardown
//! - Fast-forward replay with a reproducible report
//! - Candle CSV and report JSON export

pub mod config;
pub mod control;
pub mod export;
pub mod replay;
pub mod runtime;
pub mod store;

use anyhow::{Context, Result};

use chaosfeed_core::domain::TimestampMs;
use chaosfeed_core::{ControlStore, Simulation, SimulationConfig};

pub use control::StoreStatus;
pub use export::{export_candles_csv, export_json, import_json, save_artifacts};
pub use replay::{replay, ReplayReport, SCHEMA_VERSION};
pub use runtime::{drive, run_blocking, shutdown_signal, LiveOptions};
pub use store::JsonFileStore;

/// The control store named by `config.store_dir`, if any.
///
/// A directory that cannot be created is logged and treated as no store,
/// so the engine still starts in local mode.
pub fn open_store(config: &SimulationConfig) -> Option<Box<dyn ControlStore>> {
    let dir = config.store_dir.as_ref()?;
    match JsonFileStore::open(dir) {
        Ok(store) => Some(Box::new(store)),
        Err(err) => {
            tracing::warn!(error = %err, "control store unavailable, running offline");
            None
        }
    }
}

/// A simulation starting at `start`, connected to the configured store.
pub fn build_simulation(config: SimulationConfig, start: TimestampMs) -> Result<Simulation> {
    let sim = match open_store(&config) {
        Some(store) => Simulation::with_store(config, start, store),
        None => Simulation::new(config, start),
    };
    sim.context("invalid simulation config")
}
