//! Real-time driver.
//!
//! Runs a simulation against the wall clock on a tokio current-thread
//! runtime: sleep until the next timer deadline, advance to the current
//! wall-clock time, log what happened, repeat. Ctrl-C or SIGTERM (or an
//! optional run length) ends the loop and hands the simulation back.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use chaosfeed_core::clock::wall_clock_ms;
use chaosfeed_core::format::{format_money, format_price};
use chaosfeed_core::simulators::{Outcome, StreakEvent};
use chaosfeed_core::{Emitted, SimEvent, Simulation};

/// Upper bound on one sleep, so status lines keep coming while idle.
const MAX_SLEEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct LiveOptions {
    /// Stop after this much wall-clock time; run until a signal otherwise.
    pub duration: Option<Duration>,
    /// Interval between status lines.
    pub status_every: Duration,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            duration: None,
            status_every: Duration::from_secs(10),
        }
    }
}

/// Build a current-thread runtime and drive `sim` until shutdown.
pub fn run_blocking(sim: Simulation, options: LiveOptions) -> Result<Simulation> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(async {
        let shutdown = shutdown_signal()?;
        Ok::<_, anyhow::Error>(drive(sim, options, shutdown).await)
    })
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;

    Ok(async move {
        #[cfg(unix)]
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl-C");
        }
    })
}

/// Drive `sim` against the wall clock until `shutdown` resolves or the
/// configured duration elapses.
pub async fn drive<F>(mut sim: Simulation, options: LiveOptions, shutdown: F) -> Simulation
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let started = wall_clock_ms();
    let stop_at = options
        .duration
        .map(|d| started + i64::try_from(d.as_millis()).unwrap_or(i64::MAX));
    let status_every = i64::try_from(options.status_every.as_millis())
        .unwrap_or(i64::MAX)
        .max(1);
    let mut next_status = started + status_every;

    info!(start = started, "live driver started");
    for emitted in sim.drain_events() {
        log_event(&emitted);
    }

    loop {
        let now = wall_clock_ms();
        if stop_at.is_some_and(|stop| now >= stop) {
            info!("run length reached");
            break;
        }

        let wake = [sim.next_deadline(), stop_at, Some(next_status)]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(now);
        let sleep_ms = u64::try_from((wake - now).max(0)).unwrap_or(0);
        let sleep = tokio::time::sleep(Duration::from_millis(sleep_ms).min(MAX_SLEEP));

        tokio::select! {
            _ = &mut shutdown => break,
            _ = sleep => {}
        }

        let now = wall_clock_ms();
        for emitted in sim.advance_to(now) {
            log_event(&emitted);
        }
        if now >= next_status {
            log_status(&sim);
            next_status = now + status_every;
        }
    }

    info!(now = sim.now(), "live driver stopped");
    sim
}

fn log_event(emitted: &Emitted) {
    let at = emitted.at;
    match &emitted.event {
        SimEvent::Scheduler(transition) => info!(at, ?transition, "scheduler"),
        SimEvent::Streak(StreakEvent::Profit { amount, total }) => info!(
            at,
            amount = %format_money(*amount),
            total = %format_money(*total),
            "profit secured"
        ),
        SimEvent::Streak(StreakEvent::Correction { amount, total }) => info!(
            at,
            amount = %format_money(*amount),
            total = %format_money(*total),
            "market correction"
        ),
        SimEvent::AssetSwitched { symbol } => info!(at, %symbol, "asset switched"),
        SimEvent::Venue { venue, status } => info!(at, %venue, ?status, "venue status"),
        SimEvent::Consensus(consensus) => debug!(at, %consensus, "consensus"),
        SimEvent::Trade(print) => debug!(
            at,
            id = %print.id,
            exchange = %print.exchange,
            side = ?print.side,
            price = %format_price(print.price),
            win = print.status == Outcome::Win,
            "trade"
        ),
    }
}

fn log_status(sim: &Simulation) {
    let status = sim.status();
    info!(
        state = ?status.state,
        progress = status.progress,
        instrument = %status.instrument,
        market = ?status.market_price.map(format_price),
        token = ?status.token_price,
        total = %format_money(status.streak.accumulated_total),
        reconnecting = status.reconnecting_venues,
        "status"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaosfeed_core::SimulationConfig;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn stops_on_shutdown() {
        let sim = Simulation::new(SimulationConfig::default(), wall_clock_ms()).unwrap();
        let options = LiveOptions {
            duration: None,
            status_every: Duration::from_millis(50),
        };
        let sim = runtime().block_on(async {
            drive(sim, options, tokio::time::sleep(Duration::from_millis(300))).await
        });
        assert!(sim.status().market_price.is_some());
    }

    #[test]
    fn stops_after_duration() {
        let start = wall_clock_ms();
        let sim = Simulation::new(SimulationConfig::default(), start).unwrap();
        let options = LiveOptions {
            duration: Some(Duration::from_millis(250)),
            ..LiveOptions::default()
        };
        let sim = runtime().block_on(drive(sim, options, std::future::pending()));
        assert!(sim.now() >= start + 250);
        assert!(sim.feeds().market.aggregator().len() > 0);
    }
}
