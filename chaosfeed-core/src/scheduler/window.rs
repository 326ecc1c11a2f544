//! Daily maintenance window in the reference timezone.
//!
//! Pure functions of an injected timestamp: no wall-clock reads, so the
//! scheduler's transitions can be tested at any instant of the day.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::domain::TimestampMs;

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_DAY: i64 = 24 * 60 * MS_PER_MINUTE;

/// A fixed daily window, e.g. 23:30 for 60 minutes, crossing midnight if needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceWindow {
    pub start_hour: u32,
    pub start_minute: u32,
    pub length_minutes: u32,
}

impl Default for MaintenanceWindow {
    fn default() -> Self {
        Self {
            start_hour: 23,
            start_minute: 30,
            length_minutes: 60,
        }
    }
}

impl MaintenanceWindow {
    pub fn length_ms(&self) -> i64 {
        self.length_minutes as i64 * MS_PER_MINUTE
    }

    /// Milliseconds since the most recent window start, in `[0, day)`.
    fn offset_ms(&self, ts: TimestampMs) -> i64 {
        let local = clock::to_reference(ts);
        let ms_of_day = local.num_seconds_from_midnight() as i64 * 1_000
            + ts.rem_euclid(1_000);
        let start = (self.start_hour as i64 * 60 + self.start_minute as i64) * MS_PER_MINUTE;
        (ms_of_day - start).rem_euclid(MS_PER_DAY)
    }

    pub fn contains(&self, ts: TimestampMs) -> bool {
        self.offset_ms(ts) < self.length_ms()
    }

    /// True during the first minute of the window.
    pub fn is_start_minute(&self, ts: TimestampMs) -> bool {
        self.offset_ms(ts) < MS_PER_MINUTE
    }

    /// Fraction of the window elapsed, as a percentage, or `None` outside it.
    pub fn progress(&self, ts: TimestampMs) -> Option<f64> {
        let offset = self.offset_ms(ts);
        let length = self.length_ms();
        if length == 0 || offset >= length {
            return None;
        }
        Some((offset as f64 / length as f64 * 100.0).clamp(0.0, 100.0))
    }
}
