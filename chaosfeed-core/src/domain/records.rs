//! Persisted documents shared with the control store.
//!
//! Field names are camelCase on the wire so records written by other
//! collaborators of the same store deserialize unchanged.

use serde::{Deserialize, Serialize};

use crate::domain::{TimestampMs, TrendDirection};

/// Session control document: whether the engine should run, and when the
/// current refuel window ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRecord {
    pub is_running: bool,
    #[serde(default)]
    pub refill_end_time: Option<TimestampMs>,
}

impl ControlRecord {
    pub fn running() -> Self {
        Self {
            is_running: true,
            refill_end_time: None,
        }
    }

    pub fn paused_until(end: TimestampMs) -> Self {
        Self {
            is_running: false,
            refill_end_time: Some(end),
        }
    }
}

impl Default for ControlRecord {
    fn default() -> Self {
        Self::running()
    }
}

/// Last known quote of the synthetic token, for external override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub price: f64,
    pub trend: TrendDirection,
    pub next_update_at: TimestampMs,
}

impl TokenRecord {
    pub const INITIAL_PRICE: f64 = 0.000_150_00;

    /// Document written when the store has no token record yet.
    pub fn initial(now: TimestampMs) -> Self {
        Self {
            price: Self::INITIAL_PRICE,
            trend: TrendDirection::Up,
            next_update_at: now + 5_000,
        }
    }
}
