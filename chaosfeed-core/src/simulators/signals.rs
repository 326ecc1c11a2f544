//! Indicator signal simulator.
//!
//! Every tick each indicator flips a biased coin: with probability 0.8 it
//! agrees with the shared trend, otherwise it opposes it. The counts are
//! folded into a consensus label.

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::TrendDirection;

pub const TECH_INDICATORS: [&str; 20] = [
    "RSI(14)",
    "STOCH(9,6)",
    "STOCHRSI(14)",
    "MACD(12,26)",
    "ADX(14)",
    "W%R",
    "CCI(14)",
    "ATR(14)",
    "Highs/Lows",
    "Ult. Osc.",
    "ROC",
    "Bull/Bear",
    "SMA(5)",
    "SMA(10)",
    "SMA(20)",
    "SMA(50)",
    "SMA(100)",
    "SMA(200)",
    "EMA(10)",
    "EMA(50)",
];

pub const ALIGN_PROBABILITY: f64 = 0.8;
/// A side must lead by more than this for a STRONG label.
pub const STRONG_MARGIN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Consensus {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Consensus {
    pub fn from_counts(buy: usize, sell: usize) -> Self {
        if buy > sell + STRONG_MARGIN {
            Consensus::StrongBuy
        } else if sell > buy + STRONG_MARGIN {
            Consensus::StrongSell
        } else if buy > sell {
            Consensus::Buy
        } else {
            Consensus::Sell
        }
    }
}

impl fmt::Display for Consensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Consensus::StrongBuy => "STRONG BUY",
            Consensus::Buy => "BUY",
            Consensus::Neutral => "NEUTRAL",
            Consensus::Sell => "SELL",
            Consensus::StrongSell => "STRONG SELL",
        };
        f.write_str(label)
    }
}

/// Indicator name → signal, replaced wholesale each tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBoard {
    pub signals: BTreeMap<String, Signal>,
}

impl IndicatorBoard {
    pub fn count(&self, signal: Signal) -> usize {
        self.signals.values().filter(|s| **s == signal).count()
    }

    pub fn get(&self, indicator: &str) -> Option<Signal> {
        self.signals.get(indicator).copied()
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSignalSimulator {
    board: IndicatorBoard,
    consensus: Consensus,
    rng: StdRng,
}

impl IndicatorSignalSimulator {
    pub fn new(rng: StdRng) -> Self {
        Self {
            board: IndicatorBoard::default(),
            consensus: Consensus::Neutral,
            rng,
        }
    }

    pub fn board(&self) -> &IndicatorBoard {
        &self.board
    }

    /// NEUTRAL until the first tick.
    pub fn consensus(&self) -> Consensus {
        self.consensus
    }

    /// Redraw every indicator against a snapshot of the trend.
    pub fn tick(&mut self, trend: TrendDirection) -> Consensus {
        let mut signals = BTreeMap::new();
        for name in TECH_INDICATORS {
            let aligned = self.rng.gen_bool(ALIGN_PROBABILITY);
            let signal = match (trend, aligned) {
                (TrendDirection::Up, true) | (TrendDirection::Down, false) => Signal::Buy,
                (TrendDirection::Up, false) | (TrendDirection::Down, true) => Signal::Sell,
            };
            signals.insert(name.to_string(), signal);
        }
        self.board = IndicatorBoard { signals };
        self.consensus =
            Consensus::from_counts(self.board.count(Signal::Buy), self.board.count(Signal::Sell));
        self.consensus
    }
}
