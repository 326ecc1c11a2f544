//! chaosfeed CLI: run, replay and inspect the synthetic market engine.
//!
//! Commands:
//! - `run`: drive the engine against the wall clock until Ctrl-C
//! - `replay`: fast-forward a window of simulated time and report on it
//! - `price`: evaluate the token price engine at a time
//! - `backfill`: print the cold-start candle history as CSV
//! - `control pause|resume|status`: operate on a shared control store

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use chaosfeed_core::candles::CandleAggregator;
use chaosfeed_core::clock::{to_reference, wall_clock_ms};
use chaosfeed_core::domain::TimestampMs;
use chaosfeed_core::feed::FeedKind;
use chaosfeed_core::format::{format_money, format_price, format_token_price};
use chaosfeed_core::price::{ChaosPriceEngine, TICK_DURATION_MS};
use chaosfeed_core::SimulationConfig;
use chaosfeed_runner::{
    build_simulation, control, export_candles_csv, export_json, replay, run_blocking,
    save_artifacts, JsonFileStore, LiveOptions,
};

#[derive(Parser)]
#[command(
    name = "chaosfeed",
    about = "chaosfeed CLI: deterministic synthetic market data engine"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the config's seed.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine in real time until Ctrl-C or SIGTERM.
    Run {
        /// Control store directory; overrides the config's `store_dir`.
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Stop after this many seconds.
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Seconds between status lines.
        #[arg(long, default_value_t = 10)]
        status_secs: u64,

        /// Which feed drives asset rotation.
        #[arg(long, value_enum, default_value_t = View::Market)]
        view: View,
    },
    /// Fast-forward simulated time and print a JSON report.
    Replay {
        /// Start time: epoch milliseconds or RFC 3339. Defaults to now.
        #[arg(long)]
        start: Option<String>,

        /// Simulated minutes to run.
        #[arg(long, default_value_t = 60)]
        minutes: i64,

        /// Write report.json, market.csv and token.csv under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Evaluate the token price engine.
    Price {
        /// Time: epoch milliseconds or RFC 3339. Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Number of consecutive ticks to print.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Print the token feed's cold-start history as CSV.
    Backfill {
        /// Time: epoch milliseconds or RFC 3339. Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Candles to generate. Defaults to the configured backfill buffer.
        #[arg(long)]
        count: Option<usize>,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Operate on a shared control store.
    Control {
        /// Control store directory; overrides the config's `store_dir`.
        #[arg(long)]
        store_dir: Option<PathBuf>,

        #[command(subcommand)]
        action: ControlAction,
    },
}

#[derive(Subcommand)]
enum ControlAction {
    /// Pause every engine sharing the store.
    Pause {
        /// Pause length in minutes. Defaults to the refuel duration.
        #[arg(long, conflicts_with = "until")]
        minutes: Option<i64>,

        /// End of the pause: epoch milliseconds or RFC 3339.
        #[arg(long)]
        until: Option<String>,
    },
    /// Resume every engine sharing the store.
    Resume,
    /// Print the stored documents.
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum View {
    Market,
    Token,
}

impl From<View> for FeedKind {
    fn from(view: View) -> Self {
        match view {
            View::Market => FeedKind::Market,
            View::Token => FeedKind::Token,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = chaosfeed_runner::config::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    match cli.command {
        Commands::Run {
            store_dir,
            duration_secs,
            status_secs,
            view,
        } => run_live(config, store_dir, duration_secs, status_secs, view),
        Commands::Replay {
            start,
            minutes,
            output_dir,
        } => run_replay(config, start.as_deref(), minutes, output_dir.as_deref()),
        Commands::Price { at, count } => run_price(&config, at.as_deref(), count),
        Commands::Backfill { at, count, output } => {
            run_backfill(&config, at.as_deref(), count, output.as_deref())
        }
        Commands::Control { store_dir, action } => run_control(&config, store_dir, action),
    }
}

/// `RUST_LOG` filters (default `info`); `CHAOSFEED_LOG_FORMAT=json` switches
/// to JSON lines. Logs go to stderr so command output on stdout stays clean.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("CHAOSFEED_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run_live(
    mut config: SimulationConfig,
    store_dir: Option<PathBuf>,
    duration_secs: Option<u64>,
    status_secs: u64,
    view: View,
) -> Result<()> {
    if store_dir.is_some() {
        config.store_dir = store_dir;
    }
    let mut sim = build_simulation(config, wall_clock_ms())?;
    sim.set_view(view.into());
    if !sim.is_online() {
        warn!("no control store attached, running in local mode");
    }

    let options = LiveOptions {
        duration: duration_secs.map(Duration::from_secs),
        status_every: Duration::from_secs(status_secs.max(1)),
    };
    let sim = run_blocking(sim, options)?;

    let status = sim.status();
    println!("Final state: {:?}", status.state);
    println!("Instrument:  {}", status.instrument);
    if let Some(price) = status.market_price {
        println!("Market:      {}", format_price(price));
    }
    println!("Total:       ${}", format_money(status.streak.accumulated_total));
    if let Some(price) = status.token_price {
        println!("Token:       {}", format_token_price(price));
    }
    Ok(())
}

fn run_replay(
    config: SimulationConfig,
    start: Option<&str>,
    minutes: i64,
    output_dir: Option<&Path>,
) -> Result<()> {
    if minutes < 0 {
        bail!("--minutes must not be negative");
    }
    let start = parse_time_or_now(start)?;
    let store = chaosfeed_runner::open_store(&config);
    info!(start, minutes, "replaying");
    let (report, sim) = replay(config, start, minutes * 60_000, store)?;

    println!("{}", export_json(&report)?);
    if let Some(dir) = output_dir {
        save_artifacts(&report, &sim, dir)?;
    }
    Ok(())
}

fn run_price(config: &SimulationConfig, at: Option<&str>, count: usize) -> Result<()> {
    let engine = ChaosPriceEngine::new(config.feed.bounds()?);
    let start = parse_time_or_now(at)?;
    for i in 0..count.max(1) {
        let ts = start + i as i64 * TICK_DURATION_MS;
        println!(
            "{}  {}  {:?}",
            to_reference(ts).format("%Y-%m-%d %H:%M:%S %Z"),
            format_token_price(engine.price_at(ts)),
            engine.regime_at(ts)
        );
    }
    Ok(())
}

fn run_backfill(
    config: &SimulationConfig,
    at: Option<&str>,
    count: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    let now = parse_time_or_now(at)?;
    let count = count.unwrap_or(config.feed.backfill_candles);
    let mut engine = ChaosPriceEngine::new(config.feed.bounds()?);
    let mut candles = CandleAggregator::with_seed(config.feed.candle_duration_ms, count, config.seed);
    candles.backfill(&mut engine, now, count);

    let csv = export_candles_csv(&candles.snapshot())?;
    match output {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(candles = candles.len(), path = %path.display(), "backfill written");
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn run_control(
    config: &SimulationConfig,
    store_dir: Option<PathBuf>,
    action: ControlAction,
) -> Result<()> {
    let Some(dir) = store_dir.or_else(|| config.store_dir.clone()) else {
        bail!("no control store: pass --store-dir or set store_dir in the config");
    };
    let store = JsonFileStore::open(&dir)
        .with_context(|| format!("failed to open control store at {}", dir.display()))?;
    let now = wall_clock_ms();

    match action {
        ControlAction::Pause { minutes, until } => {
            let end = match (minutes, until) {
                (Some(m), _) => Some(now + m.max(0) * 60_000),
                (None, Some(until)) => Some(parse_time(&until)?),
                (None, None) => None,
            };
            let record =
                control::pause(&store, now, end, config.scheduler.refuel_duration_ms)?;
            if let Some(end) = record.refill_end_time {
                println!("Paused until {}", to_reference(end).format("%Y-%m-%d %H:%M:%S %Z"));
            }
        }
        ControlAction::Resume => {
            control::resume(&store)?;
            println!("Resumed");
        }
        ControlAction::Status => {
            let status = control::status(&store, now)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            if let Some(token) = status.token {
                info!(price = %format_token_price(token.price), trend = ?token.trend, "token quote");
            }
            if let Some(ms) = status.remaining_ms {
                info!(remaining_secs = ms / 1_000, "refuel in progress");
            }
        }
    }
    Ok(())
}

fn parse_time_or_now(value: Option<&str>) -> Result<TimestampMs> {
    value.map_or_else(|| Ok(wall_clock_ms()), parse_time)
}

/// Epoch milliseconds, or an RFC 3339 timestamp.
fn parse_time(value: &str) -> Result<TimestampMs> {
    if let Ok(ms) = value.parse::<i64>() {
        return Ok(ms);
    }
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("invalid time '{value}': expected epoch ms or RFC 3339"))?;
    Ok(parsed.timestamp_millis())
}
