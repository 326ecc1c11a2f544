//! Account and venue simulators driven by the timer queue.
//!
//! Each simulator owns its state and its random stream; other components
//! only see read accessors and the events a step returns.

pub mod signals;
pub mod streak;
pub mod tape;
pub mod venues;

pub use signals::{
    Consensus, IndicatorBoard, IndicatorSignalSimulator, Signal, TECH_INDICATORS,
};
pub use streak::{
    AmountRange, ProfitLossStreakSimulator, StreakConfig, StreakError, StreakEvent, StreakState,
    LOSS_TARGETS,
};
pub use tape::{Outcome, Side, TradePrint, TradeTape, TAPE_CAPACITY};
pub use venues::{ExchangeStatusBoard, VenueStatus, EXCHANGES};
