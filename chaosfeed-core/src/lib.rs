//! chaosfeed core: deterministic synthetic market data and account state.
//!
//! This crate contains the whole engine, free of clocks and I/O:
//! - A seeded oscillator and per-component random streams
//! - Two price sources: the bounded chaos engine and a biased random walk
//! - OHLCV candle aggregation with backfill and a capped window
//! - The RUNNING / REFUELING / READY session scheduler
//! - Streak, indicator, trade-tape and venue simulators
//! - A deterministic timer queue and the simulation aggregate driving it
//! - The control store contract

pub mod candles;
pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod format;
pub mod journal;
pub mod price;
pub mod rng;
pub mod scheduler;
pub mod simulators;
pub mod store;
pub mod timer;
pub mod token;

pub use config::{ConfigError, SimulationConfig};
pub use engine::{Emitted, SimEvent, Simulation, Status};
pub use store::{ControlStore, MemoryStore, StoreError};
