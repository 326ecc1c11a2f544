//! Profit/loss streak simulator.
//!
//! Emits randomized profit events until the win counter reaches a target
//! drawn from a fixed candidate set, then forces exactly one correction
//! (loss) before drawing a new target. The wait between events is drawn
//! uniformly from a configurable delay range.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LOSS_TARGETS: [u32; 6] = [8, 23, 25, 39, 45, 103];

/// Closed-open numeric range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min..self.max)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StreakError {
    #[error("invalid {name} range: [{min}, {max})")]
    InvalidRange { name: &'static str, min: f64, max: f64 },

    #[error("invalid delay range: [{min_ms}, {max_ms}] ms")]
    InvalidDelay { min_ms: i64, max_ms: i64 },

    #[error("loss target set must be non-empty and contain only positive targets")]
    InvalidTargets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    pub gain: AmountRange,
    pub loss: AmountRange,
    pub min_delay_ms: i64,
    pub max_delay_ms: i64,
    pub targets: Vec<u32>,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            gain: AmountRange::new(570.0, 1_240.0),
            loss: AmountRange::new(500.0, 2_149.0),
            min_delay_ms: 35_000,
            max_delay_ms: 180_000,
            targets: LOSS_TARGETS.to_vec(),
        }
    }
}

impl StreakConfig {
    pub fn validate(&self) -> Result<(), StreakError> {
        for (name, range) in [("gain", self.gain), ("loss", self.loss)] {
            if !range.is_valid() {
                return Err(StreakError::InvalidRange {
                    name,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        if self.min_delay_ms <= 0 || self.min_delay_ms > self.max_delay_ms {
            return Err(StreakError::InvalidDelay {
                min_ms: self.min_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        if self.targets.is_empty() || self.targets.contains(&0) {
            return Err(StreakError::InvalidTargets);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    pub accumulated_total: f64,
    pub wins_since_reset: u32,
    pub target_wins_before_loss: u32,
    pub pending_losses: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StreakEvent {
    Profit { amount: f64, total: f64 },
    Correction { amount: f64, total: f64 },
}

impl StreakEvent {
    pub fn is_loss(&self) -> bool {
        matches!(self, StreakEvent::Correction { .. })
    }

    pub fn total(&self) -> f64 {
        match *self {
            StreakEvent::Profit { total, .. } | StreakEvent::Correction { total, .. } => total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfitLossStreakSimulator {
    config: StreakConfig,
    state: StreakState,
    rng: StdRng,
}

impl ProfitLossStreakSimulator {
    pub fn new(config: StreakConfig, mut rng: StdRng) -> Result<Self, StreakError> {
        config.validate()?;
        let target = draw_target(&config.targets, &mut rng);
        Ok(Self::build(config, rng, target))
    }

    /// A simulator whose first streak has a known length.
    pub fn with_target(config: StreakConfig, rng: StdRng, target: u32) -> Result<Self, StreakError> {
        config.validate()?;
        if target == 0 {
            return Err(StreakError::InvalidTargets);
        }
        Ok(Self::build(config, rng, target))
    }

    fn build(config: StreakConfig, rng: StdRng, target: u32) -> Self {
        Self {
            config,
            state: StreakState {
                accumulated_total: 0.0,
                wins_since_reset: 0,
                target_wins_before_loss: target,
                pending_losses: 0,
            },
            rng,
        }
    }

    pub fn state(&self) -> &StreakState {
        &self.state
    }

    pub fn config(&self) -> &StreakConfig {
        &self.config
    }

    /// Wait before the next event, drawn uniformly from the delay range.
    pub fn next_delay_ms(&mut self) -> i64 {
        self.rng
            .gen_range(self.config.min_delay_ms..=self.config.max_delay_ms)
    }

    /// Apply one event.
    pub fn step(&mut self) -> StreakEvent {
        if self.state.pending_losses > 0 {
            let amount = self.config.loss.sample(&mut self.rng);
            self.state.accumulated_total -= amount;
            self.state.pending_losses -= 1;
            if self.state.pending_losses == 0 {
                self.state.wins_since_reset = 0;
                self.state.target_wins_before_loss = draw_target(&self.config.targets, &mut self.rng);
            }
            return StreakEvent::Correction {
                amount,
                total: self.state.accumulated_total,
            };
        }

        let amount = self.config.gain.sample(&mut self.rng);
        self.state.accumulated_total += amount;
        self.state.wins_since_reset += 1;
        if self.state.wins_since_reset >= self.state.target_wins_before_loss {
            self.state.pending_losses = 1;
        }
        StreakEvent::Profit {
            amount,
            total: self.state.accumulated_total,
        }
    }
}

fn draw_target(targets: &[u32], rng: &mut StdRng) -> u32 {
    targets.choose(rng).copied().unwrap_or(LOSS_TARGETS[0])
}
