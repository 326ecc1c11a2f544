//! Candle aggregation and chart-axis mapping.

pub mod aggregator;
pub mod viewport;

pub use aggregator::{
    CandleAggregator, IngestOutcome, BACKFILL_CANDLES, CANDLE_DURATION_MS, VISIBLE_CANDLES,
};
pub use viewport::{ChartViewport, MARKET_PAD, TOKEN_PAD};
