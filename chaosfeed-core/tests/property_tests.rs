//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Price determinism and bounds for any timestamp and any valid bounds
//! 2. Candle invariants, continuity and window cap under arbitrary ingests
//! 3. Refuel progress monotonicity within one episode
//! 4. Exactly one loss per completed streak
//! 5. Timer cancellation and ordering

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use chaosfeed_core::candles::{CandleAggregator, ChartViewport, CANDLE_DURATION_MS};
use chaosfeed_core::domain::Candle;
use chaosfeed_core::price::{ChaosPriceEngine, PriceBounds, PriceSource};
use chaosfeed_core::rng::seeded_random;
use chaosfeed_core::scheduler::{SchedulerConfig, SessionScheduler};
use chaosfeed_core::simulators::{ProfitLossStreakSimulator, StreakConfig};
use chaosfeed_core::timer::TimerQueue;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_timestamp() -> impl Strategy<Value = i64> {
    -4_000_000_000_000_i64..4_000_000_000_000_i64
}

fn arb_bounds() -> impl Strategy<Value = PriceBounds> {
    (0.000_001..1_000.0_f64, 0.000_001..1_000.0_f64).prop_map(|(lo, width)| {
        PriceBounds::new(lo, lo + width).expect("positive width")
    })
}

/// Ascending timestamps with occasional same-bucket repeats and gaps.
fn arb_ticks() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((0_i64..90_000, 1.0..200.0_f64), 1..300).prop_map(|steps| {
        let mut t = 0;
        steps
            .into_iter()
            .map(|(dt, p)| {
                t += dt;
                (t, p)
            })
            .collect()
    })
}

fn check_series(series: &[Candle], duration: i64) -> Result<(), TestCaseError> {
    for c in series {
        prop_assert!(c.is_sane(), "insane candle {:?}", c);
        prop_assert_eq!(c.bucket_start.rem_euclid(duration), 0);
    }
    for pair in series.windows(2) {
        prop_assert_eq!(pair[1].open, pair[0].close);
        prop_assert!(pair[1].bucket_start > pair[0].bucket_start);
    }
    Ok(())
}

// ── 1. Price engine ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn price_is_deterministic_and_bounded(ts in arb_timestamp(), bounds in arb_bounds()) {
        let engine = ChaosPriceEngine::new(bounds);
        let a = engine.price_at(ts);
        let b = engine.price_at(ts);
        prop_assert_eq!(a.to_bits(), b.to_bits());
        prop_assert!(bounds.contains(a), "{} outside {:?}", a, bounds);
    }

    #[test]
    fn oscillator_in_unit_interval(c in any::<i64>()) {
        let v = seeded_random(c);
        prop_assert!((0.0..1.0).contains(&v));
    }

    #[test]
    fn price_is_constant_within_a_tick(tick in -1_000_000_i64..1_000_000, offset in 0_i64..5_000) {
        let engine = ChaosPriceEngine::default();
        prop_assert_eq!(engine.price_at(tick * 5_000), engine.price_at(tick * 5_000 + offset));
    }
}

// ── 2. Aggregation ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn live_ingest_keeps_invariants(ticks in arb_ticks(), capacity in 1_usize..50) {
        let mut agg = CandleAggregator::with_seed(CANDLE_DURATION_MS, capacity, 3);
        for (t, p) in &ticks {
            agg.ingest(*t, *p);
            prop_assert!(agg.len() <= capacity);
        }
        check_series(&agg.snapshot(), CANDLE_DURATION_MS)?;
    }

    #[test]
    fn backfill_keeps_invariants(now in 0_i64..4_000_000_000_000, count in 1_usize..120) {
        let mut engine = ChaosPriceEngine::default();
        let mut agg = CandleAggregator::with_seed(CANDLE_DURATION_MS, 100, 0);
        agg.backfill(&mut engine, now, count);
        let series = agg.snapshot();
        prop_assert_eq!(series.len(), count.min(100));
        check_series(&series, CANDLE_DURATION_MS)?;
        let last = series.last().map(|c| c.bucket_start);
        prop_assert_eq!(last, Some(agg.bucket_start(now) - CANDLE_DURATION_MS));
        for c in &series {
            prop_assert!(engine.bounds().contains(c.high) && engine.bounds().contains(c.low));
        }
    }

    #[test]
    fn viewport_maps_into_percent(ticks in arb_ticks(), probe in -1e6..1e6_f64) {
        let mut agg = CandleAggregator::with_seed(1_000, 150, 1);
        for (t, p) in &ticks {
            agg.ingest(*t, *p);
        }
        let vp = ChartViewport::fit(&agg.snapshot(), 0.0002).expect("non-empty");
        let y = vp.y_percent(probe);
        prop_assert!((0.0..=100.0).contains(&y));
        prop_assert_eq!(vp.y_percent(f64::NAN), 50.0);
    }
}

// ── 3. Scheduler ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn refuel_progress_never_decreases(
        start in 0_i64..1_000_000_000,
        length in 1_i64..7_200_000,
        samples in prop::collection::vec(0_i64..60_000, 1..200),
    ) {
        let mut s = SessionScheduler::new(SchedulerConfig::default());
        let end = start + length;
        s.pause(start, Some(end));
        let mut now = start;
        let mut last = s.progress();
        for dt in samples {
            now += dt;
            let ready = s.check(now).is_some();
            prop_assert!(s.progress() >= last);
            prop_assert!((0.0..=100.0).contains(&s.progress()));
            last = s.progress();
            if ready {
                prop_assert!(now >= end);
                prop_assert_eq!(s.progress(), 100.0);
                break;
            }
        }
    }
}

// ── 4. Streak ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn one_loss_per_streak(seed in any::<u64>(), target in 1_u32..30) {
        let mut sim = ProfitLossStreakSimulator::with_target(
            StreakConfig::default(),
            StdRng::seed_from_u64(seed),
            target,
        ).expect("valid config");
        let mut wins = 0;
        let mut current_target = target;
        for _ in 0..500 {
            let event = sim.step();
            if event.is_loss() {
                prop_assert_eq!(wins, current_target);
                prop_assert_eq!(sim.state().pending_losses, 0);
                prop_assert_eq!(sim.state().wins_since_reset, 0);
                current_target = sim.state().target_wins_before_loss;
                wins = 0;
            } else {
                wins += 1;
                prop_assert!(wins <= current_target);
            }
        }
    }
}

// ── 5. Timer queue ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn timers_fire_in_order_and_cancelled_never_fire(
        dues in prop::collection::vec(0_i64..10_000, 1..60),
        cancel_mask in prop::collection::vec(any::<bool>(), 60),
    ) {
        let mut q = TimerQueue::new();
        let ids: Vec<_> = dues.iter().enumerate().map(|(i, d)| q.schedule_once(*d, i)).collect();
        for (i, id) in ids.iter().enumerate() {
            if cancel_mask[i] {
                q.cancel(*id);
            }
        }
        let mut last = i64::MIN;
        let mut fired = 0;
        while let Some(f) = q.pop_due(10_000) {
            prop_assert!(!cancel_mask[f.kind], "cancelled task {} fired", f.kind);
            prop_assert!(f.due >= last);
            last = f.due;
            fired += 1;
        }
        let expected = (0..dues.len()).filter(|i| !cancel_mask[*i]).count();
        prop_assert_eq!(fired, expected);
    }
}

#[test]
fn engine_is_usable_as_dyn_source() {
    let mut engine = ChaosPriceEngine::default();
    let source: &mut dyn PriceSource = &mut engine;
    let p = source.sample(1_000);
    assert!(PriceBounds::default().contains(p));
}
