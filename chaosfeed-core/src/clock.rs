//! Reference-timezone clock.
//!
//! Every wall-clock rule in the engine (the daily maintenance window, the
//! weekday/weekend instrument split) is evaluated in one fixed reference
//! timezone. This module is the only place that converts epoch milliseconds
//! into that zone, so the rules above it stay pure functions of an injected
//! timestamp.

use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::domain::TimestampMs;

/// Session timezone of the simulated venue.
pub const REFERENCE_TZ: Tz = chrono_tz::Asia::Tokyo;

/// Convert epoch milliseconds to a reference-zone datetime.
///
/// Timestamps outside chrono's representable range clamp to the epoch.
pub fn to_reference(ts: TimestampMs) -> DateTime<Tz> {
    let utc = Utc
        .timestamp_millis_opt(ts)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    utc.with_timezone(&REFERENCE_TZ)
}

/// Saturday or Sunday in the reference zone.
pub fn is_weekend(ts: TimestampMs) -> bool {
    matches!(to_reference(ts).weekday(), Weekday::Sat | Weekday::Sun)
}

/// Current wall-clock time in epoch milliseconds.
///
/// Only the real-time driver should call this; everything in the core takes
/// `now` as a parameter.
pub fn wall_clock_ms() -> TimestampMs {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn converts_to_tokyo() {
        // 2024-01-01T14:30:00Z is 23:30 in Tokyo (UTC+9)
        let ts = Utc
            .with_ymd_and_hms(2024, 1, 1, 14, 30, 0)
            .unwrap()
            .timestamp_millis();
        let local = to_reference(ts);
        assert_eq!(local.hour(), 23);
        assert_eq!(local.minute(), 30);
    }

    #[test]
    fn weekend_is_evaluated_in_reference_zone() {
        // Friday 2024-01-05 20:00 UTC is already Saturday 05:00 in Tokyo
        let ts = Utc
            .with_ymd_and_hms(2024, 1, 5, 20, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert!(is_weekend(ts));

        // Monday 2024-01-08 00:00 UTC is Monday 09:00 in Tokyo
        let ts = Utc
            .with_ymd_and_hms(2024, 1, 8, 0, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert!(!is_weekend(ts));
    }
}
