//! Instrument tables for the market feed.
//!
//! Two fixed name → base price tables. The regular set trades on weekdays;
//! on weekends (reference-zone calendar) the OTC set replaces the forex,
//! metal and index names with their `-OTC` variants. Crypto pairs trade in
//! both.

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::domain::TimestampMs;

/// A tradable name and the price its synthetic history starts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instrument {
    pub symbol: &'static str,
    pub base_price: f64,
}

const fn inst(symbol: &'static str, base_price: f64) -> Instrument {
    Instrument { symbol, base_price }
}

pub const REGULAR_INSTRUMENTS: [Instrument; 9] = [
    inst("BTC/USDT", 96_450.00),
    inst("ETH/USDT", 3_250.00),
    inst("XRP/USDT", 2.02),
    inst("SOL/USDT", 135.50),
    inst("EUR/USD", 1.0845),
    inst("GBP/USD", 1.2650),
    inst("XAU/USD", 2_650.00),
    inst("NDX100", 18_200.00),
    inst("US30", 39_500.00),
];

pub const OTC_INSTRUMENTS: [Instrument; 9] = [
    inst("BTC/USDT", 96_450.00),
    inst("ETH/USDT", 3_250.00),
    inst("XRP/USDT", 2.02),
    inst("SOL/USDT", 135.50),
    inst("EUR/USD-OTC", 1.0845),
    inst("GBP/USD-OTC", 1.2650),
    inst("XAU/USD-OTC", 2_650.00),
    inst("NDX100-OTC", 18_200.00),
    inst("US30-OTC", 39_500.00),
];

/// Which instrument table is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentSet {
    Regular,
    Otc,
}

impl InstrumentSet {
    /// Weekdays trade the regular set, weekends the OTC set.
    pub fn for_timestamp(ts: TimestampMs) -> Self {
        if clock::is_weekend(ts) {
            InstrumentSet::Otc
        } else {
            InstrumentSet::Regular
        }
    }

    pub fn instruments(self) -> &'static [Instrument] {
        match self {
            InstrumentSet::Regular => &REGULAR_INSTRUMENTS,
            InstrumentSet::Otc => &OTC_INSTRUMENTS,
        }
    }

    pub fn lookup(self, symbol: &str) -> Option<Instrument> {
        self.instruments().iter().copied().find(|i| i.symbol == symbol)
    }

    /// The instrument the market feed opens on.
    pub fn default_instrument(self) -> Instrument {
        self.instruments()[0]
    }
}
