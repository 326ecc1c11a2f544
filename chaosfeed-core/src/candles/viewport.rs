//! Price-axis mapping for a window of candles.
//!
//! The viewport zooms to the window's extremes with a small relative pad and
//! maps prices onto a 0–100 vertical percentage (0 at the top). Non-finite
//! prices map to the midpoint so a NaN can never reach a renderer.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Relative pad around the token feed's extremes.
pub const TOKEN_PAD: f64 = 0.001;
/// Relative pad around the market feed's extremes.
pub const MARKET_PAD: f64 = 0.0002;

const MIN_RANGE: f64 = 0.000_001;
const MIDPOINT: f64 = 50.0;
const GRID_FRACTIONS: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartViewport {
    pub min: f64,
    pub max: f64,
}

impl ChartViewport {
    /// Fit a viewport around `candles` padded by `pad` on each side.
    ///
    /// Returns `None` when no candle carries finite extremes.
    pub fn fit(candles: &[Candle], pad: f64) -> Option<Self> {
        let lows = candles.iter().map(|c| c.low).filter(|v| v.is_finite());
        let highs = candles.iter().map(|c| c.high).filter(|v| v.is_finite());
        let low = lows.fold(f64::INFINITY, f64::min);
        let high = highs.fold(f64::NEG_INFINITY, f64::max);
        if !low.is_finite() || !high.is_finite() {
            return None;
        }
        Some(Self {
            min: low * (1.0 - pad),
            max: high * (1.0 + pad),
        })
    }

    pub fn range(&self) -> f64 {
        let r = self.max - self.min;
        if r > 0.0 && r.is_finite() {
            r
        } else {
            MIN_RANGE
        }
    }

    /// Vertical position of `price` as a percentage from the top, in [0, 100].
    pub fn y_percent(&self, price: f64) -> f64 {
        if !price.is_finite() {
            return MIDPOINT;
        }
        let y = 100.0 - ((price - self.min) / self.range()) * 100.0;
        if y.is_nan() {
            return MIDPOINT;
        }
        y.clamp(0.0, 100.0)
    }

    /// Horizontal grid line prices at 20/40/60/80% of the range.
    pub fn grid_prices(&self) -> [f64; 4] {
        GRID_FRACTIONS.map(|f| self.min + self.range() * f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(low: f64, high: f64) -> Candle {
        Candle {
            open: low,
            high,
            low,
            close: high,
            volume: 1.0,
            bucket_start: 0,
        }
    }

    #[test]
    fn fit_pads_extremes() {
        let v = ChartViewport::fit(&[candle(100.0, 110.0), candle(95.0, 105.0)], 0.001).unwrap();
        assert!((v.min - 95.0 * 0.999).abs() < 1e-9);
        assert!((v.max - 110.0 * 1.001).abs() < 1e-9);
    }

    #[test]
    fn non_finite_price_maps_to_midpoint() {
        let v = ChartViewport { min: 1.0, max: 2.0 };
        assert_eq!(v.y_percent(f64::NAN), 50.0);
        assert_eq!(v.y_percent(f64::INFINITY), 50.0);
        assert_eq!(v.y_percent(f64::NEG_INFINITY), 50.0);
    }

    #[test]
    fn y_is_clamped_and_inverted() {
        let v = ChartViewport { min: 0.0, max: 100.0 };
        assert_eq!(v.y_percent(0.0), 100.0);
        assert_eq!(v.y_percent(100.0), 0.0);
        assert_eq!(v.y_percent(25.0), 75.0);
        assert_eq!(v.y_percent(500.0), 0.0);
        assert_eq!(v.y_percent(-500.0), 100.0);
    }

    #[test]
    fn flat_window_uses_minimum_range() {
        let v = ChartViewport { min: 5.0, max: 5.0 };
        assert_eq!(v.range(), MIN_RANGE);
        assert_eq!(v.y_percent(5.0), 100.0);
    }

    #[test]
    fn empty_window_has_no_viewport() {
        assert!(ChartViewport::fit(&[], TOKEN_PAD).is_none());
    }

    #[test]
    fn grid_is_evenly_spaced() {
        let v = ChartViewport { min: 0.0, max: 10.0 };
        for (got, want) in v.grid_prices().iter().zip([2.0, 4.0, 6.0, 8.0]) {
            assert!((got - want).abs() < 1e-12);
        }
    }
}
