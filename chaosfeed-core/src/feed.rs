//! The two candle feeds and the view selector.
//!
//! A [`Feed`] pairs a price source with the aggregator it fills. The token
//! feed is a pure function of time and keeps ticking whatever the session
//! state; the market feed follows the random walk and is gated by the
//! scheduler. [`FeedKind`] picks which one a viewer looks at.

use serde::{Deserialize, Serialize};

use crate::candles::{CandleAggregator, ChartViewport, IngestOutcome, MARKET_PAD, TOKEN_PAD};
use crate::domain::{Candle, Instrument, TimestampMs};
use crate::price::{ChaosPriceEngine, MarketWalk, PriceSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Market,
    Token,
}

impl FeedKind {
    /// Zoom padding used when fitting the viewport.
    pub fn pad(self) -> f64 {
        match self {
            FeedKind::Market => MARKET_PAD,
            FeedKind::Token => TOKEN_PAD,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            FeedKind::Market => FeedKind::Token,
            FeedKind::Token => FeedKind::Market,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Feed<S> {
    kind: FeedKind,
    source: S,
    candles: CandleAggregator,
    visible: usize,
    last_price: Option<f64>,
}

impl<S: PriceSource> Feed<S> {
    pub fn new(kind: FeedKind, source: S, candles: CandleAggregator, visible: usize) -> Self {
        Self {
            kind,
            source,
            candles,
            visible: visible.max(1),
            last_price: None,
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn aggregator(&self) -> &CandleAggregator {
        &self.candles
    }

    /// Last sampled price, falling back to the newest close.
    pub fn last_price(&self) -> Option<f64> {
        self.last_price.or_else(|| self.candles.latest().map(|c| c.close))
    }

    /// Sample the source at `now` and fold the print into the candles.
    pub fn tick(&mut self, now: TimestampMs) -> (f64, IngestOutcome) {
        let price = self.source.sample(now);
        let outcome = self.candles.ingest(now, price);
        if outcome != IngestOutcome::Rejected {
            self.last_price = Some(price);
        }
        (price, outcome)
    }

    /// The visible window, oldest first.
    pub fn visible(&self) -> Vec<Candle> {
        self.candles.recent(self.visible)
    }

    pub fn viewport(&self) -> Option<ChartViewport> {
        ChartViewport::fit(&self.visible(), self.kind.pad())
    }
}

impl Feed<ChaosPriceEngine> {
    /// Rebuild the whole buffer from the engine's history before `now`.
    pub fn backfill(&mut self, now: TimestampMs) {
        let count = self.candles.capacity();
        self.candles.backfill(&mut self.source, now, count);
        self.last_price = None;
    }
}

impl Feed<MarketWalk> {
    /// Switch instrument and synthesize a visible window of history ending
    /// with the bucket that contains `now`.
    pub fn reseed(&mut self, instrument: Instrument, now: TimestampMs) {
        self.source.reset(instrument);
        let last = self.candles.bucket_start(now);
        let history =
            self.source
                .seed_history(self.visible, last, self.candles.duration_ms());
        self.candles.replace_history(history);
        self.last_price = Some(self.source.price());
    }
}

/// Both feeds plus the active view.
#[derive(Debug, Clone)]
pub struct FeedSet {
    pub market: Feed<MarketWalk>,
    pub token: Feed<ChaosPriceEngine>,
    view: FeedKind,
}

impl FeedSet {
    pub fn new(market: Feed<MarketWalk>, token: Feed<ChaosPriceEngine>) -> Self {
        Self {
            market,
            token,
            view: FeedKind::Market,
        }
    }

    pub fn view(&self) -> FeedKind {
        self.view
    }

    pub fn set_view(&mut self, view: FeedKind) {
        self.view = view;
    }

    pub fn visible(&self, kind: FeedKind) -> Vec<Candle> {
        match kind {
            FeedKind::Market => self.market.visible(),
            FeedKind::Token => self.token.visible(),
        }
    }

    pub fn viewport(&self, kind: FeedKind) -> Option<ChartViewport> {
        match kind {
            FeedKind::Market => self.market.viewport(),
            FeedKind::Token => self.token.viewport(),
        }
    }

    pub fn last_price(&self, kind: FeedKind) -> Option<f64> {
        match kind {
            FeedKind::Market => self.market.last_price(),
            FeedKind::Token => self.token.last_price(),
        }
    }

    /// Candles of the active view.
    pub fn active(&self) -> Vec<Candle> {
        self.visible(self.view)
    }
}
