//! Chaos price engine: a bounded, deterministic price as a function of time.
//!
//! The timestamp is quantized to a 5-second tick. Two slow sinusoids give the
//! base signal, oscillator jitter scaled by a volatility envelope adds texture,
//! and a slow regime phase alternates between a damped ranging mode and a
//! trending mode with a growing directional drift. The raw signal is wrapped
//! into `[0, 1)`, clamped to `[0.02, 0.98]` and mapped onto the price bounds.

use serde::{Deserialize, Serialize};

use super::{PriceError, PriceSource};
use crate::domain::{TimestampMs, TrendDirection};
use crate::rng::seeded_random;

pub const TICK_DURATION_MS: i64 = 5_000;
pub const REGIME_PERIOD_TICKS: i64 = 240;
pub const VOLATILITY_PERIOD_TICKS: i64 = 60;

/// Below this |phase| the market ranges instead of trending.
const RANGING_THRESHOLD: f64 = 0.4;
const CLAMP_LO: f64 = 0.02;
const CLAMP_HI: f64 = 0.98;

pub const TOKEN_MIN_PRICE: f64 = 0.000_092_1;
pub const TOKEN_MAX_PRICE: f64 = 0.007_234_1;

/// Inclusive price range the engine maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

impl PriceBounds {
    pub fn new(min: f64, max: f64) -> Result<Self, PriceError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(PriceError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            min: TOKEN_MIN_PRICE,
            max: TOKEN_MAX_PRICE,
        }
    }
}

/// Qualitative market mode at a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Ranging,
    Trending(TrendDirection),
}

#[derive(Debug, Clone)]
pub struct ChaosPriceEngine {
    bounds: PriceBounds,
}

impl ChaosPriceEngine {
    pub fn new(bounds: PriceBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> PriceBounds {
        self.bounds
    }

    /// Tick index for a timestamp (floor division, also for negatives).
    pub fn tick_index(ts: TimestampMs) -> i64 {
        ts.div_euclid(TICK_DURATION_MS)
    }

    pub fn regime_at(&self, ts: TimestampMs) -> Regime {
        let phase = regime_phase(Self::tick_index(ts));
        classify(phase)
    }

    /// Price at a timestamp. Pure: the same timestamp always gives the same
    /// price, and the price always lies inside the bounds.
    pub fn price_at(&self, ts: TimestampMs) -> f64 {
        let normalized = normalized_signal(Self::tick_index(ts));
        self.bounds.min + normalized * self.bounds.span()
    }
}

impl Default for ChaosPriceEngine {
    fn default() -> Self {
        Self::new(PriceBounds::default())
    }
}

impl PriceSource for ChaosPriceEngine {
    fn name(&self) -> &str {
        "chaos"
    }

    fn sample(&mut self, ts: TimestampMs) -> f64 {
        self.price_at(ts)
    }
}

fn regime_phase(tick: i64) -> f64 {
    (tick as f64 / REGIME_PERIOD_TICKS as f64).sin()
}

fn classify(phase: f64) -> Regime {
    if phase.abs() < RANGING_THRESHOLD {
        Regime::Ranging
    } else if phase > 0.0 {
        Regime::Trending(TrendDirection::Up)
    } else {
        Regime::Trending(TrendDirection::Down)
    }
}

/// Raw layered signal for a tick, wrapped and clamped into `[0.02, 0.98]`.
fn normalized_signal(tick: i64) -> f64 {
    let t = tick as f64;
    let volatility = ((t / VOLATILITY_PERIOD_TICKS as f64).sin().abs() + 0.5) * 0.7;

    let mut signal = (t * 0.02).sin() + (t * 0.07).cos() * 0.5;
    let jitter = (seeded_random(tick) - 0.5) * 1.5;
    signal += jitter * 0.15 * volatility;

    match classify(regime_phase(tick)) {
        Regime::Ranging => {
            signal *= 0.25;
            signal += (t * 0.5).sin() * 0.05;
        }
        Regime::Trending(direction) => {
            let ticks_into_regime = tick.rem_euclid(REGIME_PERIOD_TICKS) as f64;
            signal += direction.sign() * ticks_into_regime * 0.01;
        }
    }

    let wrapped = (((signal + 3.0) / 6.0) % 1.0).abs();
    if wrapped.is_nan() {
        return 0.5;
    }
    wrapped.clamp(CLAMP_LO, CLAMP_HI)
}
