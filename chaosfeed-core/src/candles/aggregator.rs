//! Fixed-duration OHLCV aggregation over a capped rolling window.
//!
//! Invariants maintained on every mutation:
//! - every candle satisfies `high >= max(open, close)` and `low <= min(open, close)`;
//! - consecutive candles chain: `candles[i + 1].open == candles[i].close`;
//! - `bucket_start` is a multiple of the candle duration;
//! - the window never holds more than `capacity` candles (FIFO eviction).

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{Candle, TimestampMs};
use crate::price::{PriceSource, TICK_DURATION_MS};
use crate::rng::seeded_random;

pub const CANDLE_DURATION_MS: i64 = 30_000;
pub const VISIBLE_CANDLES: usize = 150;
pub const BACKFILL_CANDLES: usize = 400;

/// Volume a freshly opened live candle starts with.
const SEED_VOLUME: f64 = 500.0;
/// Exclusive upper bound of the per-tick volume increment.
const MAX_VOLUME_INCREMENT: u32 = 50;

/// What `ingest` did with a print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    /// Folded into the newest candle.
    Updated,
    /// Opened a new candle.
    Opened,
    /// Older than the newest bucket; ignored.
    Stale,
    /// Non-finite price; ignored.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct CandleAggregator {
    duration_ms: i64,
    capacity: usize,
    candles: VecDeque<Candle>,
    volume_rng: StdRng,
}

impl CandleAggregator {
    pub fn new(duration_ms: i64, capacity: usize, volume_rng: StdRng) -> Self {
        let capacity = capacity.max(1);
        Self {
            duration_ms: duration_ms.max(1),
            capacity,
            candles: VecDeque::with_capacity(capacity + 1),
            volume_rng,
        }
    }

    pub fn with_seed(duration_ms: i64, capacity: usize, seed: u64) -> Self {
        Self::new(duration_ms, capacity, StdRng::seed_from_u64(seed))
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Start of the bucket containing `ts`.
    pub fn bucket_start(&self, ts: TimestampMs) -> TimestampMs {
        ts.div_euclid(self.duration_ms) * self.duration_ms
    }

    /// Fold one print into the series.
    pub fn ingest(&mut self, ts: TimestampMs, price: f64) -> IngestOutcome {
        if !price.is_finite() {
            return IngestOutcome::Rejected;
        }
        let bucket = self.bucket_start(ts);

        match self.candles.back().map(|c| c.bucket_start) {
            Some(latest) if latest == bucket => {
                let increment = self.volume_rng.gen_range(0..MAX_VOLUME_INCREMENT) as f64;
                if let Some(candle) = self.candles.back_mut() {
                    candle.absorb(price, increment);
                }
                IngestOutcome::Updated
            }
            Some(latest) if bucket < latest => IngestOutcome::Stale,
            _ => {
                let open = self.candles.back().map_or(price, |c| c.close);
                self.push(Candle::opened_at(bucket, open, price, SEED_VOLUME));
                IngestOutcome::Opened
            }
        }
    }

    /// All retained candles, oldest first.
    pub fn snapshot(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }

    /// The newest `count` candles, oldest first.
    pub fn recent(&self, count: usize) -> Vec<Candle> {
        let skip = self.candles.len().saturating_sub(count);
        self.candles.iter().skip(skip).copied().collect()
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }

    /// Replace the whole series, keeping only the newest `capacity` candles.
    pub fn replace_history(&mut self, history: Vec<Candle>) {
        let skip = history.len().saturating_sub(self.capacity);
        self.candles = history.into_iter().skip(skip).collect();
    }

    /// Cold-start history: rebuild the series from the `count` buckets
    /// preceding the one that contains `now`.
    ///
    /// Each bucket samples `source` once per price tick. Opens chain to the
    /// previous close, and high/low are widened to cover the chained open.
    /// Volume is derived from the oscillator so the history is reproducible.
    pub fn backfill<S: PriceSource + ?Sized>(
        &mut self,
        source: &mut S,
        now: TimestampMs,
        count: usize,
    ) {
        let current = self.bucket_start(now);
        let sub_ticks = (self.duration_ms / TICK_DURATION_MS).max(1);
        let step = self.duration_ms / sub_ticks;
        let mut history: Vec<Candle> = Vec::with_capacity(count);

        for i in (1..=count as i64).rev() {
            let bucket_start = current - i * self.duration_ms;
            let first = source.sample(bucket_start);
            let (mut high, mut low, mut close) = (first, first, first);
            for k in 1..sub_ticks {
                let price = source.sample(bucket_start + k * step);
                high = high.max(price);
                low = low.min(price);
                close = price;
            }

            let open = history.last().map_or(first, |prev| prev.close);
            let volume = (seeded_random(bucket_start) * 5_000.0).floor() + 1_000.0;
            history.push(Candle {
                open,
                high: high.max(open),
                low: low.min(open),
                close,
                volume,
                bucket_start,
            });
        }

        self.replace_history(history);
    }

    fn push(&mut self, candle: Candle) {
        self.candles.push_back(candle);
        while self.candles.len() > self.capacity {
            self.candles.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::ChaosPriceEngine;

    fn agg(capacity: usize) -> CandleAggregator {
        CandleAggregator::with_seed(CANDLE_DURATION_MS, capacity, 1)
    }

    #[test]
    fn same_bucket_updates_in_place() {
        let mut a = agg(10);
        assert_eq!(a.ingest(0, 10.0), IngestOutcome::Opened);
        assert_eq!(a.ingest(10_000, 12.0), IngestOutcome::Updated);
        assert_eq!(a.ingest(20_000, 9.0), IngestOutcome::Updated);
        let c = a.latest().unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!((c.open, c.high, c.low, c.close), (10.0, 12.0, 9.0, 9.0));
        assert!(c.volume >= SEED_VOLUME);
    }

    #[test]
    fn new_bucket_opens_at_previous_close() {
        let mut a = agg(10);
        a.ingest(0, 10.0);
        a.ingest(29_999, 11.0);
        assert_eq!(a.ingest(30_000, 15.0), IngestOutcome::Opened);
        let s = a.snapshot();
        assert_eq!(s.len(), 2);
        assert_eq!(s[1].open, 11.0);
        assert_eq!(s[1].low, 11.0);
        assert_eq!(s[1].high, 15.0);
        assert_eq!(s[1].bucket_start, 30_000);
    }

    #[test]
    fn gaps_still_chain() {
        let mut a = agg(10);
        a.ingest(0, 10.0);
        a.ingest(300_000, 8.0);
        let s = a.snapshot();
        assert_eq!(s[1].open, s[0].close);
        assert_eq!(s[1].bucket_start, 300_000);
    }

    #[test]
    fn window_is_capped_fifo() {
        let mut a = agg(3);
        for i in 0..10 {
            a.ingest(i * CANDLE_DURATION_MS, i as f64 + 1.0);
        }
        let s = a.snapshot();
        assert_eq!(s.len(), 3);
        assert_eq!(s[0].bucket_start, 7 * CANDLE_DURATION_MS);
    }

    #[test]
    fn stale_and_non_finite_prints_are_ignored() {
        let mut a = agg(10);
        a.ingest(60_000, 10.0);
        assert_eq!(a.ingest(0, 50.0), IngestOutcome::Stale);
        assert_eq!(a.ingest(61_000, f64::NAN), IngestOutcome::Rejected);
        assert_eq!(a.ingest(61_000, f64::INFINITY), IngestOutcome::Rejected);
        let c = a.latest().unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(c.close, 10.0);
        assert!(c.is_sane());
    }

    #[test]
    fn negative_timestamps_floor() {
        let a = agg(10);
        assert_eq!(a.bucket_start(-1), -CANDLE_DURATION_MS);
        assert_eq!(a.bucket_start(-30_000), -30_000);
    }

    #[test]
    fn backfill_builds_continuous_history() {
        let mut engine = ChaosPriceEngine::default();
        let mut a = agg(BACKFILL_CANDLES);
        let now = 1_735_000_012_345;
        a.backfill(&mut engine, now, BACKFILL_CANDLES);

        let s = a.snapshot();
        assert_eq!(s.len(), BACKFILL_CANDLES);
        let current = a.bucket_start(now);
        assert_eq!(s.last().unwrap().bucket_start, current - CANDLE_DURATION_MS);
        for pair in s.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
            assert_eq!(pair[1].bucket_start - pair[0].bucket_start, CANDLE_DURATION_MS);
        }
        for c in &s {
            assert!(c.is_sane());
            assert_eq!(c.bucket_start % CANDLE_DURATION_MS, 0);
            assert!((1_000.0..6_000.0).contains(&c.volume));
        }
    }

    #[test]
    fn backfill_is_deterministic() {
        let mut engine = ChaosPriceEngine::default();
        let mut a = agg(50);
        let mut b = agg(50);
        a.backfill(&mut engine, 1_000_000_000, 50);
        b.backfill(&mut engine, 1_000_000_000, 50);
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn backfill_then_live_ingest_chains() {
        let mut engine = ChaosPriceEngine::default();
        let mut a = agg(20);
        let now = 900_000;
        a.backfill(&mut engine, now, 20);
        let before = *a.latest().unwrap();
        let price = engine.price_at(now);
        assert_eq!(a.ingest(now, price), IngestOutcome::Opened);
        let s = a.snapshot();
        assert_eq!(s.len(), 20);
        assert_eq!(s.last().unwrap().open, before.close);
    }

    #[test]
    fn recent_returns_tail() {
        let mut a = agg(10);
        for i in 0..6 {
            a.ingest(i * CANDLE_DURATION_MS, 1.0 + i as f64);
        }
        let tail = a.recent(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].close, 6.0);
        assert_eq!(a.recent(100).len(), 6);
    }
}
