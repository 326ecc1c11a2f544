//! End-to-end scenarios for the leaf components.

use rand::rngs::StdRng;
use rand::SeedableRng;

use chaosfeed_core::candles::{CandleAggregator, IngestOutcome, CANDLE_DURATION_MS};
use chaosfeed_core::price::ChaosPriceEngine;
use chaosfeed_core::scheduler::{SchedulerState, SchedulerTransition, SessionScheduler};
use chaosfeed_core::simulators::{ProfitLossStreakSimulator, StreakConfig};

#[test]
fn scenario_a_same_timestamp_thousand_times() {
    let engine = ChaosPriceEngine::default();
    let t = 1_704_880_812_345;
    let first = engine.price_at(t);
    for _ in 0..1_000 {
        assert_eq!(engine.price_at(t).to_bits(), first.to_bits());
    }
}

#[test]
fn scenario_b_two_candles_chain() {
    let mut agg = CandleAggregator::with_seed(CANDLE_DURATION_MS, 150, 0);
    let outcomes: Vec<_> = [(0, 1.0), (10_000, 1.5), (20_000, 0.8), (30_000, 1.2)]
        .into_iter()
        .map(|(t, p)| agg.ingest(t, p))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            IngestOutcome::Opened,
            IngestOutcome::Updated,
            IngestOutcome::Updated,
            IngestOutcome::Opened,
        ]
    );

    let candles = agg.snapshot();
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[1].open, candles[0].close);
    assert_eq!(candles[0].high, 1.5);
    assert_eq!(candles[0].low, 0.8);
}

#[test]
fn scenario_c_elapsed_end_goes_ready() {
    let now = 1_000_000;
    let mut s = SessionScheduler::default();
    s.pause(now, Some(now - 1));
    let t = s.check(now);
    assert_eq!(s.progress(), 100.0);
    assert!(matches!(t, Some(SchedulerTransition::Ready { until }) if until == now + 3_000));
    assert_eq!(s.state(), SchedulerState::Ready { since: now });
}

#[test]
fn scenario_d_three_wins_then_loss() {
    let mut sim = ProfitLossStreakSimulator::with_target(
        StreakConfig::default(),
        StdRng::seed_from_u64(99),
        3,
    )
    .unwrap();
    for _ in 0..3 {
        assert!(!sim.step().is_loss());
    }
    assert_eq!(sim.state().pending_losses, 1);

    assert!(sim.step().is_loss());
    assert_eq!(sim.state().pending_losses, 0);
    assert_eq!(sim.state().wins_since_reset, 0);
}
