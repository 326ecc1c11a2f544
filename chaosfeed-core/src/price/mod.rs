//! Price sources.
//!
//! Both feeds draw prices through the [`PriceSource`] trait: the token feed
//! from the pure [`ChaosPriceEngine`], the market feed from the stateful
//! [`MarketWalk`]. Aggregation never needs to know which one it is fed by.

pub mod chaos;
pub mod walk;

use thiserror::Error;

use crate::domain::TimestampMs;

pub use chaos::{ChaosPriceEngine, PriceBounds, Regime, TICK_DURATION_MS};
pub use walk::MarketWalk;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PriceError {
    #[error("invalid price bounds: min {min} must be finite and below max {max}")]
    InvalidBounds { min: f64, max: f64 },
}

/// Anything that can produce a price for a timestamp.
pub trait PriceSource: Send {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Produce the price for `ts`. Stateful sources may advance internally.
    fn sample(&mut self, ts: TimestampMs) -> f64;
}
