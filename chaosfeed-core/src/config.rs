//! Simulation configuration.
//!
//! Every field has a default, so an empty document is a valid configuration
//! and a file only needs to name what it overrides. Parsing from TOML lives
//! in the runner; this module only defines the shape and its validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candles::{BACKFILL_CANDLES, CANDLE_DURATION_MS, VISIBLE_CANDLES};
use crate::domain::{InstrumentSet, TimestampMs};
use crate::price::{PriceBounds, PriceError, TICK_DURATION_MS};
use crate::scheduler::SchedulerConfig;
use crate::simulators::tape::DEFAULT_WIN_RATE;
use crate::simulators::{StreakConfig, StreakError};

/// Duration of one market-feed candle (about ten walk steps).
pub const MARKET_CANDLE_DURATION_MS: i64 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Streak(#[from] StreakError),

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: i64 },

    #[error("feed.candle_duration_ms ({value}) must be a multiple of the {tick} ms price tick")]
    TickMultiple { value: i64, tick: i64 },

    #[error("visible window ({visible}) must be between 1 and the backfill buffer ({backfill})")]
    Window { visible: usize, backfill: usize },

    #[error("win rate must be within [0, 1], got {0}")]
    WinRate(f64),

    #[error("maintenance window start {hour:02}:{minute:02} is not a time of day")]
    WindowStart { hour: u32, minute: u32 },

    #[error("maintenance window length must be between 1 and 1439 minutes, got {0}")]
    WindowLength(u32),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Token candle duration; a multiple of the 5 s price tick.
    pub candle_duration_ms: i64,
    pub market_candle_duration_ms: i64,
    pub visible_candles: usize,
    pub backfill_candles: usize,
    pub token_min_price: f64,
    pub token_max_price: f64,
    /// Initial market instrument; defaults to the first of the active set.
    pub instrument: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let bounds = PriceBounds::default();
        Self {
            candle_duration_ms: CANDLE_DURATION_MS,
            market_candle_duration_ms: MARKET_CANDLE_DURATION_MS,
            visible_candles: VISIBLE_CANDLES,
            backfill_candles: BACKFILL_CANDLES,
            token_min_price: bounds.min,
            token_max_price: bounds.max,
            instrument: None,
        }
    }
}

impl FeedConfig {
    pub fn bounds(&self) -> Result<PriceBounds, PriceError> {
        PriceBounds::new(self.token_min_price, self.token_max_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalsConfig {
    pub interval_ms: i64,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self { interval_ms: 1_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeConfig {
    /// Probability that a print is a win.
    pub win_rate: f64,
    pub interval_ms: i64,
}

impl Default for TapeConfig {
    fn default() -> Self {
        Self {
            win_rate: DEFAULT_WIN_RATE,
            interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master seed for every random stream.
    pub seed: u64,
    /// Directory of the JSON control store; offline when unset.
    pub store_dir: Option<PathBuf>,
    pub feed: FeedConfig,
    pub scheduler: SchedulerConfig,
    pub streak: StreakConfig,
    pub signals: SignalsConfig,
    pub tape: TapeConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            store_dir: None,
            feed: FeedConfig::default(),
            scheduler: SchedulerConfig::default(),
            streak: StreakConfig::default(),
            signals: SignalsConfig::default(),
            tape: TapeConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.feed.bounds()?;
        self.streak.validate()?;

        for (name, value) in [
            ("feed.candle_duration_ms", self.feed.candle_duration_ms),
            ("feed.market_candle_duration_ms", self.feed.market_candle_duration_ms),
            ("scheduler.refuel_duration_ms", self.scheduler.refuel_duration_ms),
            ("scheduler.ready_delay_ms", self.scheduler.ready_delay_ms),
            ("signals.interval_ms", self.signals.interval_ms),
            ("tape.interval_ms", self.tape.interval_ms),
        ] {
            if value <= 0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.feed.candle_duration_ms % TICK_DURATION_MS != 0 {
            return Err(ConfigError::TickMultiple {
                value: self.feed.candle_duration_ms,
                tick: TICK_DURATION_MS,
            });
        }

        let (visible, backfill) = (self.feed.visible_candles, self.feed.backfill_candles);
        if visible == 0 || visible > backfill {
            return Err(ConfigError::Window { visible, backfill });
        }

        let rate = self.tape.win_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::WinRate(rate));
        }

        let window = self.scheduler.window;
        if window.start_hour > 23 || window.start_minute > 59 {
            return Err(ConfigError::WindowStart {
                hour: window.start_hour,
                minute: window.start_minute,
            });
        }
        if !(1..24 * 60).contains(&window.length_minutes) {
            return Err(ConfigError::WindowLength(window.length_minutes));
        }

        if let Some(symbol) = &self.feed.instrument {
            let known = [InstrumentSet::Regular, InstrumentSet::Otc]
                .into_iter()
                .any(|set| set.lookup(symbol).is_some());
            if !known {
                return Err(ConfigError::UnknownInstrument(symbol.clone()));
            }
        }
        Ok(())
    }

    /// Content hash of the configuration, stable across runs.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    /// Instrument the market feed starts on at `now`. A configured symbol
    /// is matched against the active set with or without its `-OTC` suffix.
    pub fn initial_instrument(&self, now: TimestampMs) -> crate::domain::Instrument {
        let set = InstrumentSet::for_timestamp(now);
        self.feed
            .instrument
            .as_deref()
            .and_then(|symbol| {
                set.lookup(symbol)
                    .or_else(|| set.lookup(&format!("{symbol}-OTC")))
                    .or_else(|| symbol.strip_suffix("-OTC").and_then(|s| set.lookup(s)))
            })
            .unwrap_or_else(|| set.default_instrument())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = SimulationConfig::default();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.seed = 7;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = SimulationConfig::default();
        c.feed.token_min_price = 1.0;
        c.feed.token_max_price = 0.5;
        assert!(matches!(c.validate(), Err(ConfigError::Price(_))));

        let mut c = SimulationConfig::default();
        c.feed.visible_candles = 500;
        assert!(matches!(c.validate(), Err(ConfigError::Window { .. })));

        let mut c = SimulationConfig::default();
        c.tape.win_rate = 94.2;
        assert!(matches!(c.validate(), Err(ConfigError::WinRate(_))));

        let mut c = SimulationConfig::default();
        c.feed.candle_duration_ms = 7_000;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::TickMultiple { value: 7_000, .. })
        ));

        let mut c = SimulationConfig::default();
        c.signals.interval_ms = 0;
        assert!(matches!(c.validate(), Err(ConfigError::NonPositive { .. })));

        for length in [0, 1_440, 5_000] {
            let mut c = SimulationConfig::default();
            c.scheduler.window.length_minutes = length;
            assert!(matches!(c.validate(), Err(ConfigError::WindowLength(l)) if l == length));
        }
        let mut c = SimulationConfig::default();
        c.scheduler.window.length_minutes = 1_439;
        c.validate().unwrap();

        let mut c = SimulationConfig::default();
        c.streak.min_delay_ms = 0;
        assert!(matches!(c.validate(), Err(ConfigError::Streak(_))));

        let mut c = SimulationConfig::default();
        c.feed.instrument = Some("DOGE/USDT".into());
        assert!(matches!(c.validate(), Err(ConfigError::UnknownInstrument(_))));
    }
}
