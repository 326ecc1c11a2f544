//! Exchange connectivity board.
//!
//! Each shuffle picks one venue at random: a connected venue may drop into
//! RECONNECTING (never more than four at once), a reconnecting venue
//! usually recovers. Shuffles are rescheduled after a random 2–5 s wait.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const EXCHANGES: [&str; 13] = [
    "BINANCE",
    "KUCOIN",
    "BYBIT",
    "EXNESS",
    "OCTAFX",
    "IQOPTION",
    "DERIV",
    "COINBASE",
    "KRAKEN",
    "OKX",
    "QUOTEX",
    "POCKETOPTION",
    "GATE.IO",
];

pub const MAX_RECONNECTING: usize = 4;
pub const FIRST_SHUFFLE_DELAY_MS: i64 = 2_000;
const DROP_PROBABILITY: f64 = 0.2;
const RECOVER_PROBABILITY: f64 = 0.7;
const MIN_SHUFFLE_DELAY_MS: i64 = 2_000;
const MAX_SHUFFLE_DELAY_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VenueStatus {
    Connected,
    Reconnecting,
}

#[derive(Debug, Clone)]
pub struct ExchangeStatusBoard {
    statuses: Vec<(&'static str, VenueStatus)>,
    rng: StdRng,
}

impl ExchangeStatusBoard {
    pub fn new(rng: StdRng) -> Self {
        Self {
            statuses: EXCHANGES
                .iter()
                .map(|name| (*name, VenueStatus::Connected))
                .collect(),
            rng,
        }
    }

    pub fn statuses(&self) -> &[(&'static str, VenueStatus)] {
        &self.statuses
    }

    pub fn status(&self, venue: &str) -> Option<VenueStatus> {
        self.statuses
            .iter()
            .find(|(name, _)| *name == venue)
            .map(|(_, s)| *s)
    }

    pub fn reconnecting(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(_, s)| *s == VenueStatus::Reconnecting)
            .count()
    }

    /// Maybe flip one venue. Returns the venue and its new status on change.
    pub fn shuffle(&mut self) -> Option<(&'static str, VenueStatus)> {
        let reconnecting = self.reconnecting();
        let idx = self.rng.gen_range(0..self.statuses.len());
        let (name, current) = self.statuses[idx];
        let next = match current {
            VenueStatus::Connected
                if reconnecting < MAX_RECONNECTING && self.rng.gen_bool(DROP_PROBABILITY) =>
            {
                VenueStatus::Reconnecting
            }
            VenueStatus::Reconnecting if self.rng.gen_bool(RECOVER_PROBABILITY) => {
                VenueStatus::Connected
            }
            unchanged => unchanged,
        };
        if next == current {
            return None;
        }
        self.statuses[idx].1 = next;
        Some((name, next))
    }

    pub fn next_delay_ms(&mut self) -> i64 {
        self.rng.gen_range(MIN_SHUFFLE_DELAY_MS..=MAX_SHUFFLE_DELAY_MS)
    }
}
