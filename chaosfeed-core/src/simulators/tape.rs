//! Simulated trade prints for the market feed.
//!
//! On each high-frequency tick a print is recorded with probability 0.85.
//! Prints win with the configured win rate; the tape keeps the newest 40.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::venues::EXCHANGES;
use crate::domain::TimestampMs;

pub const TAPE_CAPACITY: usize = 40;
pub const PRINT_PROBABILITY: f64 = 0.85;
pub const DEFAULT_WIN_RATE: f64 = 0.942;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Win,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePrint {
    pub id: String,
    pub time: TimestampMs,
    pub exchange: String,
    pub pair: String,
    pub side: Side,
    pub price: f64,
    pub profit: f64,
    pub status: Outcome,
}

#[derive(Debug, Clone)]
pub struct TradeTape {
    win_rate: f64,
    prints: VecDeque<TradePrint>,
    rng: StdRng,
}

impl TradeTape {
    /// `win_rate` is a probability and is clamped into `[0, 1]`.
    pub fn new(win_rate: f64, rng: StdRng) -> Self {
        let win_rate = if win_rate.is_finite() {
            win_rate.clamp(0.0, 1.0)
        } else {
            DEFAULT_WIN_RATE
        };
        Self {
            win_rate,
            prints: VecDeque::with_capacity(TAPE_CAPACITY + 1),
            rng,
        }
    }

    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }

    /// Newest first.
    pub fn prints(&self) -> impl Iterator<Item = &TradePrint> {
        self.prints.iter()
    }

    pub fn len(&self) -> usize {
        self.prints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prints.is_empty()
    }

    /// Possibly record a print for `pair` at `price`.
    pub fn tick(&mut self, now: TimestampMs, pair: &str, price: f64) -> Option<&TradePrint> {
        if !self.rng.gen_bool(PRINT_PROBABILITY) {
            return None;
        }
        let win = self.rng.gen_bool(self.win_rate);
        let profit = if win {
            self.rng.gen_range(10.0..250.0)
        } else {
            self.rng.gen_range(-25.0..-5.0)
        };
        let exchange = EXCHANGES.choose(&mut self.rng).copied().unwrap_or(EXCHANGES[0]);
        let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let print = TradePrint {
            id: self.next_id(),
            time: now,
            exchange: exchange.to_string(),
            pair: pair.to_string(),
            side,
            price,
            profit,
            status: if win { Outcome::Win } else { Outcome::Loss },
        };

        self.prints.push_front(print);
        self.prints.truncate(TAPE_CAPACITY);
        self.prints.front()
    }

    fn next_id(&mut self) -> String {
        (0..ID_LEN)
            .map(|_| ID_ALPHABET[self.rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn tape_is_capped_newest_first() {
        let mut tape = TradeTape::new(DEFAULT_WIN_RATE, StdRng::seed_from_u64(1));
        for t in 0..500 {
            tape.tick(t, "BTC/USDT", 100.0);
        }
        assert_eq!(tape.len(), TAPE_CAPACITY);
        let times: Vec<_> = tape.prints().map(|p| p.time).collect();
        assert!(times.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn profit_sign_matches_outcome() {
        let mut tape = TradeTape::new(0.5, StdRng::seed_from_u64(2));
        for t in 0..200 {
            if let Some(p) = tape.tick(t, "EUR/USD", 1.08) {
                match p.status {
                    Outcome::Win => assert!((10.0..250.0).contains(&p.profit)),
                    Outcome::Loss => assert!((-25.0..-5.0).contains(&p.profit)),
                }
                assert_eq!(p.id.len(), ID_LEN);
                assert!(EXCHANGES.contains(&p.exchange.as_str()));
            }
        }
    }

    #[test]
    fn win_rate_is_clamped() {
        let tape = TradeTape::new(4.0, StdRng::seed_from_u64(0));
        assert_eq!(tape.win_rate(), 1.0);
        let tape = TradeTape::new(f64::NAN, StdRng::seed_from_u64(0));
        assert_eq!(tape.win_rate(), DEFAULT_WIN_RATE);
    }
}
