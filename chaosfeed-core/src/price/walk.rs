//! Biased random walk driving the market feed.
//!
//! Each step moves the price by a uniform draw within ±0.03% plus a bias of a
//! fifth of that range in the trend direction. The trend itself is a
//! flip-flop owned here and flipped with 2% probability per step; the
//! indicator simulator reads a copy of it.

use rand::rngs::StdRng;
use rand::Rng;

use super::PriceSource;
use crate::domain::{Candle, Instrument, TimestampMs, TrendDirection};

const STEP_VOLATILITY: f64 = 0.0003;
const TREND_BIAS: f64 = 0.2;
const TREND_FLIP_PROBABILITY: f64 = 0.02;
const HISTORY_VOLATILITY: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct MarketWalk {
    instrument: Instrument,
    price: f64,
    trend: TrendDirection,
    rng: StdRng,
}

impl MarketWalk {
    pub fn new(instrument: Instrument, rng: StdRng) -> Self {
        Self {
            instrument,
            price: instrument.base_price,
            trend: TrendDirection::Up,
            rng,
        }
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn trend(&self) -> TrendDirection {
        self.trend
    }

    /// Switch to another instrument, restarting from its base price.
    pub fn reset(&mut self, instrument: Instrument) {
        self.instrument = instrument;
        self.price = instrument.base_price;
    }

    /// Advance one step and return the new price.
    pub fn step(&mut self) -> f64 {
        if self.rng.gen_bool(TREND_FLIP_PROBABILITY) {
            self.trend = self.trend.flipped();
        }
        let volatility = self.price * STEP_VOLATILITY;
        let bias = volatility * TREND_BIAS * self.trend.sign();
        let change = if volatility > 0.0 {
            self.rng.gen_range(-volatility..volatility)
        } else {
            0.0
        };
        let next = self.price + change + bias;
        if next.is_finite() && next > 0.0 {
            self.price = next;
        }
        self.price
    }

    /// Synthesize `count` continuous candles ending with the bucket that
    /// starts at `last_bucket_start`, starting from the instrument's base
    /// price. The walk continues from the last close.
    pub fn seed_history(
        &mut self,
        count: usize,
        last_bucket_start: TimestampMs,
        duration_ms: i64,
    ) -> Vec<Candle> {
        let base = self.instrument.base_price;
        let volatility = base * HISTORY_VOLATILITY;
        let mut current = base;
        let mut candles = Vec::with_capacity(count);

        for i in 0..count {
            let offset = (count - 1 - i) as i64;
            let bucket_start = last_bucket_start - offset * duration_ms;
            let open = current;
            let close = current + self.symmetric(volatility);
            let high = open.max(close) + self.upper(volatility * 0.5);
            let low = open.min(close) - self.upper(volatility * 0.5);
            let volume = self.upper(100.0);
            candles.push(Candle {
                open,
                high,
                low,
                close,
                volume,
                bucket_start,
            });
            current = close;
        }

        self.price = current;
        candles
    }

    fn symmetric(&mut self, width: f64) -> f64 {
        if width > 0.0 {
            self.rng.gen_range(-width..width)
        } else {
            0.0
        }
    }

    fn upper(&mut self, width: f64) -> f64 {
        if width > 0.0 {
            self.rng.gen_range(0.0..width)
        } else {
            0.0
        }
    }
}

impl PriceSource for MarketWalk {
    fn name(&self) -> &str {
        self.instrument.symbol
    }

    fn sample(&mut self, _ts: TimestampMs) -> f64 {
        self.step()
    }
}
