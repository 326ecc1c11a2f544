//! Export: candle CSV and replay report JSON.
//!
//! Persisted reports carry a `schema_version`; unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};

use chaosfeed_core::domain::Candle;
use chaosfeed_core::format::format_price;
use chaosfeed_core::Simulation;

use crate::replay::{ReplayReport, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &ReplayReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize replay report")
}

pub fn import_json(json: &str) -> Result<ReplayReport> {
    let report: ReplayReport =
        serde_json::from_str(json).context("failed to deserialize replay report")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Candles as CSV, oldest first.
///
/// Columns: bucket_start, time, open, high, low, close, volume. `time` is
/// the bucket start in RFC 3339 UTC. Prices are written with full
/// precision; `display_close` carries the formatted close.
pub fn export_candles_csv(candles: &[Candle]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "bucket_start",
        "time",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "display_close",
    ])?;

    for c in candles {
        let time = Utc
            .timestamp_millis_opt(c.bucket_start)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        wtr.write_record([
            &c.bucket_start.to_string(),
            &time,
            &c.open.to_string(),
            &c.high.to_string(),
            &c.low.to_string(),
            &c.close.to_string(),
            &format!("{:.0}", c.volume),
            &format_price(c.close),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save a replay's artifacts under `output_dir`.
///
/// Creates `{fingerprint prefix}_{start}/` containing:
/// - `report.json`: the `ReplayReport`
/// - `market.csv`: the market feed's retained candles
/// - `token.csv`: the token feed's retained candles
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &ReplayReport, sim: &Simulation, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = report.fingerprint.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{prefix}_{}", report.start));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    let feeds = sim.feeds();
    for (name, candles) in [
        ("market.csv", feeds.market.aggregator().snapshot()),
        ("token.csv", feeds.token.aggregator().snapshot()),
    ] {
        std::fs::write(run_dir.join(name), export_candles_csv(&candles)?)?;
    }

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(bucket_start: i64, close: f64) -> Candle {
        Candle {
            open: 1.0,
            high: close.max(1.0),
            low: close.min(1.0),
            close,
            volume: 1_234.0,
            bucket_start,
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = export_candles_csv(&[candle(0, 1.5), candle(30_000, 0.75)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("bucket_start,time,open"));
        assert!(lines[1].starts_with("0,1970-01-01T00:00:00+00:00,1,1.5,1,1.5,1234,"));
        assert!(lines[2].ends_with(",0.7500"));
    }

    #[test]
    fn future_schema_is_rejected() {
        let (report, _) = crate::replay::replay(
            chaosfeed_core::SimulationConfig::default(),
            1_704_880_800_000,
            5_000,
            None,
        )
        .unwrap();
        let mut value: serde_json::Value =
            serde_json::from_str(&export_json(&report).unwrap()).unwrap();
        value["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
        assert!(import_json(&value.to_string()).is_err());
    }
}
