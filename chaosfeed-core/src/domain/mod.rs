//! Domain types for the synthetic feed

pub mod candle;
pub mod instrument;
pub mod records;
pub mod trend;

pub use candle::{Candle, TimestampMs};
pub use instrument::{Instrument, InstrumentSet, OTC_INSTRUMENTS, REGULAR_INSTRUMENTS};
pub use records::{ControlRecord, TokenRecord};
pub use trend::TrendDirection;
