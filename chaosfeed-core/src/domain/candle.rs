//! Candle, the fundamental market data unit.

use serde::{Deserialize, Serialize};

/// Epoch milliseconds.
pub type TimestampMs = i64;

/// OHLCV candle covering one fixed-duration bucket.
///
/// `bucket_start` is the inclusive start of the bucket and is always a
/// multiple of the aggregator's candle duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub bucket_start: TimestampMs,
}

impl Candle {
    /// A candle opened at `open` whose first trade printed at `price`.
    pub fn opened_at(bucket_start: TimestampMs, open: f64, price: f64, volume: f64) -> Self {
        Self {
            open,
            high: open.max(price),
            low: open.min(price),
            close: price,
            volume,
            bucket_start,
        }
    }

    /// Fold a new print into the candle.
    pub fn absorb(&mut self, price: f64, volume: f64) {
        self.close = price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.volume += volume;
    }

    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// OHLC envelope check: high covers open and close, low is below both.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}
