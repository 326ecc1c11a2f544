//! The simulation aggregate.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::events::{Emitted, SimEvent};
use crate::candles::CandleAggregator;
use crate::config::{ConfigError, SimulationConfig};
use crate::domain::{ControlRecord, InstrumentSet, TimestampMs, TokenRecord, TrendDirection};
use crate::feed::{Feed, FeedKind, FeedSet};
use crate::format::{format_money, format_token_price};
use crate::journal::ActivityLog;
use crate::price::{ChaosPriceEngine, MarketWalk};
use crate::rng::{streams, RngHierarchy};
use crate::scheduler::{SchedulerState, SchedulerTransition, SessionScheduler};
use crate::simulators::{
    Consensus, ExchangeStatusBoard, IndicatorSignalSimulator, ProfitLossStreakSimulator,
    StreakEvent, StreakState, TradeTape,
};
use crate::simulators::venues::FIRST_SHUFFLE_DELAY_MS;
use crate::store::ControlStore;
use crate::timer::{Fired, TaskId, TimerQueue};
use crate::token::TokenConverter;

pub const MARKET_TICK_MS: i64 = 100;
pub const TOKEN_TICK_MS: i64 = 1_000;
pub const SCHEDULER_CHECK_MS: i64 = 1_000;
pub const ROTATION_MS: i64 = 10_000;
pub const STORE_SYNC_MS: i64 = 10_000;

/// Lead time of the `nextUpdateAt` field in published token quotes.
const TOKEN_QUOTE_LEAD_MS: i64 = 5_000;

/// Kinds of timer task. A task carries nothing but its kind; everything it
/// needs is read from the simulation when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Task {
    MarketTick,
    TapeTick,
    Indicators,
    Streak,
    AssetRotation,
    TokenTick,
    SchedulerCheck,
    VenueShuffle,
    StoreSync,
    ReadyDelay,
}

impl Task {
    /// Gated tasks only run while the scheduler is RUNNING.
    pub fn is_gated(self) -> bool {
        matches!(
            self,
            Task::MarketTick | Task::TapeTick | Task::Indicators | Task::Streak | Task::AssetRotation
        )
    }
}

/// Point-in-time summary for display and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub now: TimestampMs,
    pub state: SchedulerState,
    pub progress: f64,
    pub online: bool,
    pub view: FeedKind,
    pub instrument: String,
    pub market_price: Option<f64>,
    pub token_price: Option<f64>,
    pub token_trend: TrendDirection,
    pub consensus: Consensus,
    pub streak: StreakState,
    pub reconnecting_venues: usize,
    pub trades: usize,
    pub log: Vec<String>,
}

pub struct Simulation {
    config: SimulationConfig,
    now: TimestampMs,
    timers: TimerQueue<Task>,
    gated: BTreeMap<Task, TaskId>,
    ready_task: Option<TaskId>,
    /// Due time of the armed streak step.
    streak_due: Option<TimestampMs>,
    /// Delay left on a streak step interrupted by a pause.
    streak_held: Option<i64>,
    scheduler: SessionScheduler,
    feeds: FeedSet,
    token_trend: TrendDirection,
    streak: ProfitLossStreakSimulator,
    signals: IndicatorSignalSimulator,
    tape: TradeTape,
    venues: ExchangeStatusBoard,
    rotation_rng: StdRng,
    log: ActivityLog,
    store: Option<Box<dyn ControlStore>>,
    events: Vec<Emitted>,
}

impl Simulation {
    /// Offline simulation: all state is local.
    pub fn new(config: SimulationConfig, start: TimestampMs) -> Result<Self, ConfigError> {
        Self::build(config, start, None)
    }

    /// Simulation synchronized with a control store. If the store cannot be
    /// read at startup the simulation runs offline.
    pub fn with_store(
        config: SimulationConfig,
        start: TimestampMs,
        store: Box<dyn ControlStore>,
    ) -> Result<Self, ConfigError> {
        Self::build(config, start, Some(store))
    }

    fn build(
        config: SimulationConfig,
        start: TimestampMs,
        store: Option<Box<dyn ControlStore>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rngs = RngHierarchy::new(config.seed);
        let feed_cfg = &config.feed;

        let mut token = Feed::new(
            FeedKind::Token,
            ChaosPriceEngine::new(feed_cfg.bounds()?),
            CandleAggregator::new(
                feed_cfg.candle_duration_ms,
                feed_cfg.backfill_candles,
                rngs.rng_for(streams::VOLUME),
            ),
            feed_cfg.visible_candles,
        );
        token.backfill(start);

        let instrument = config.initial_instrument(start);
        let mut market = Feed::new(
            FeedKind::Market,
            MarketWalk::new(instrument, rngs.rng_for(streams::WALK)),
            CandleAggregator::new(
                feed_cfg.market_candle_duration_ms,
                feed_cfg.visible_candles,
                rngs.rng_for(streams::MARKET_VOLUME),
            ),
            feed_cfg.visible_candles,
        );
        market.reseed(instrument, start);

        let streak =
            ProfitLossStreakSimulator::new(config.streak.clone(), rngs.rng_for(streams::STREAK))?;

        let mut sim = Self {
            scheduler: SessionScheduler::new(config.scheduler),
            feeds: FeedSet::new(market, token),
            token_trend: TrendDirection::Up,
            streak,
            signals: IndicatorSignalSimulator::new(rngs.rng_for(streams::SIGNALS)),
            tape: TradeTape::new(config.tape.win_rate, rngs.rng_for(streams::TAPE)),
            venues: ExchangeStatusBoard::new(rngs.rng_for(streams::VENUES)),
            rotation_rng: rngs.rng_for(streams::ROTATION),
            log: ActivityLog::default(),
            timers: TimerQueue::new(),
            gated: BTreeMap::new(),
            ready_task: None,
            streak_due: None,
            streak_held: None,
            store: None,
            events: Vec::new(),
            now: start,
            config,
        };

        info!(
            seed = sim.config.seed,
            instrument = instrument.symbol,
            start,
            "simulation initialized"
        );
        sim.log.push(format!("ENGINE ONLINE: {}", instrument.symbol));

        if let Some(store) = store {
            sim.connect_store(store);
        }
        sim.enter_open_window();

        sim.timers
            .schedule_repeating(start + TOKEN_TICK_MS, TOKEN_TICK_MS, Task::TokenTick);
        sim.timers.schedule_repeating(
            start + SCHEDULER_CHECK_MS,
            SCHEDULER_CHECK_MS,
            Task::SchedulerCheck,
        );
        sim.timers
            .schedule_once(start + FIRST_SHUFFLE_DELAY_MS, Task::VenueShuffle);
        sim.timers
            .schedule_repeating(start + STORE_SYNC_MS, STORE_SYNC_MS, Task::StoreSync);
        if sim.scheduler.is_running() {
            sim.arm_gated();
        }
        Ok(sim)
    }

    // ── accessors ───────────────────────────────────────────────────────

    pub fn now(&self) -> TimestampMs {
        self.now
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &SessionScheduler {
        &self.scheduler
    }

    pub fn feeds(&self) -> &FeedSet {
        &self.feeds
    }

    pub fn streak(&self) -> &ProfitLossStreakSimulator {
        &self.streak
    }

    pub fn signals(&self) -> &IndicatorSignalSimulator {
        &self.signals
    }

    pub fn tape(&self) -> &TradeTape {
        &self.tape
    }

    pub fn venues(&self) -> &ExchangeStatusBoard {
        &self.venues
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn token_trend(&self) -> TrendDirection {
        self.token_trend
    }

    /// Whether a control store is attached.
    pub fn is_online(&self) -> bool {
        self.store.is_some()
    }

    /// Whether the given task kind is currently armed.
    pub fn is_armed(&self, task: Task) -> bool {
        self.gated
            .get(&task)
            .is_some_and(|id| self.timers.is_scheduled(*id))
    }

    pub fn next_deadline(&mut self) -> Option<TimestampMs> {
        self.timers.next_deadline()
    }

    /// The live token quote, in the shape of the stored record.
    pub fn token_quote(&self) -> TokenRecord {
        TokenRecord {
            price: self
                .feeds
                .token
                .last_price()
                .unwrap_or(TokenRecord::INITIAL_PRICE),
            trend: self.token_trend,
            next_update_at: self.now + TOKEN_QUOTE_LEAD_MS,
        }
    }

    /// A converter locked to the current token price.
    pub fn converter(&self) -> TokenConverter {
        TokenConverter::new(self.token_quote().price)
    }

    pub fn status(&self) -> Status {
        Status {
            now: self.now,
            state: self.scheduler.state(),
            progress: self.scheduler.progress(),
            online: self.is_online(),
            view: self.feeds.view(),
            instrument: self.feeds.market.source().instrument().symbol.to_string(),
            market_price: self.feeds.market.last_price(),
            token_price: self.feeds.token.last_price(),
            token_trend: self.token_trend,
            consensus: self.signals.consensus(),
            streak: self.streak.state().clone(),
            reconnecting_venues: self.venues.reconnecting(),
            trades: self.tape.len(),
            log: self.log.entries().map(str::to_string).collect(),
        }
    }

    // ── driving ─────────────────────────────────────────────────────────

    /// Run every task due at or before `target` and return what happened.
    /// Time never moves backwards; an earlier `target` only drains events.
    pub fn advance_to(&mut self, target: TimestampMs) -> Vec<Emitted> {
        while let Some(fired) = self.timers.pop_due(target) {
            self.now = self.now.max(fired.due);
            self.dispatch(fired);
        }
        self.now = self.now.max(target);
        self.drain_events()
    }

    /// Events emitted by commands since the last drain.
    pub fn drain_events(&mut self) -> Vec<Emitted> {
        std::mem::take(&mut self.events)
    }

    // ── commands ────────────────────────────────────────────────────────

    /// Pause until `end`, or for one refuel duration.
    pub fn pause(&mut self, end: Option<TimestampMs>) {
        let transition = self.scheduler.pause(self.now, end);
        self.write_control(self.scheduler.control_record());
        self.on_transition(transition);
    }

    pub fn resume(&mut self) {
        if let Some(transition) = self.scheduler.resume() {
            self.write_control(ControlRecord::running());
            self.on_transition(transition);
        }
    }

    pub fn set_view(&mut self, view: FeedKind) {
        if self.feeds.view() != view {
            debug!(?view, "view changed");
            self.feeds.set_view(view);
        }
    }

    // ── dispatch ────────────────────────────────────────────────────────

    fn dispatch(&mut self, fired: Fired<Task>) {
        let task = fired.kind;
        if task.is_gated() && !self.scheduler.is_running() {
            self.timers.cancel(fired.id);
            self.gated.remove(&task);
            return;
        }

        match task {
            Task::MarketTick => {
                let (price, outcome) = self.feeds.market.tick(self.now);
                debug!(price, ?outcome, "market tick");
            }
            Task::TapeTick => self.tape_tick(),
            Task::Indicators => {
                let trend = self.feeds.market.source().trend();
                let consensus = self.signals.tick(trend);
                debug!(%consensus, "indicators updated");
                self.emit(SimEvent::Consensus(consensus));
            }
            Task::Streak => self.streak_step(),
            Task::AssetRotation => self.rotate_asset(),
            Task::TokenTick => self.token_tick(),
            Task::SchedulerCheck => {
                if let Some(transition) = self.scheduler.check(self.now) {
                    self.on_transition(transition);
                }
            }
            Task::VenueShuffle => self.shuffle_venues(),
            Task::StoreSync => self.sync_store(),
            Task::ReadyDelay => {
                self.ready_task = None;
                if let Some(transition) = self.scheduler.complete_ready(self.now) {
                    self.write_control(ControlRecord::running());
                    self.on_transition(transition);
                }
            }
        }
    }

    fn tape_tick(&mut self) {
        let pair = self.feeds.market.source().instrument().symbol;
        let Some(price) = self.feeds.market.last_price() else {
            return;
        };
        if let Some(print) = self.tape.tick(self.now, pair, price).cloned() {
            self.emit(SimEvent::Trade(print));
        }
    }

    fn streak_step(&mut self) {
        let event = self.streak.step();
        match event {
            StreakEvent::Profit { amount, total } => {
                info!(amount, total, "profit secured");
                self.log.push(format!(
                    "PROFIT SECURED: +${} | SYNCING WALLET NODES...",
                    format_money(amount)
                ));
            }
            StreakEvent::Correction { amount, total } => {
                info!(amount, total, "market correction");
                self.log.push(format!(
                    "MARKET CORRECTION: -${} | ADJUSTING ALGORITHM...",
                    format_money(amount)
                ));
            }
        }
        self.emit(SimEvent::Streak(event));

        let delay = self.streak.next_delay_ms();
        self.schedule_streak(delay);
    }

    fn schedule_streak(&mut self, delay: i64) {
        let due = self.now + delay;
        let id = self.timers.schedule_once(due, Task::Streak);
        self.gated.insert(Task::Streak, id);
        self.streak_due = Some(due);
    }

    fn rotate_asset(&mut self) {
        if self.feeds.view() != FeedKind::Market {
            return;
        }
        let set = InstrumentSet::for_timestamp(self.now);
        let Some(instrument) = set.instruments().choose(&mut self.rotation_rng).copied() else {
            return;
        };
        self.feeds.market.reseed(instrument, self.now);
        info!(symbol = instrument.symbol, ?set, "switching asset");
        self.log
            .push(format!("SWITCHING ASSET >>> {}", instrument.symbol));
        self.log.push("LIQUIDITY POOL STATUS: UPDATED");
        self.emit(SimEvent::AssetSwitched {
            symbol: instrument.symbol.to_string(),
        });
    }

    fn token_tick(&mut self) {
        let previous = self.feeds.token.last_price();
        let (price, outcome) = self.feeds.token.tick(self.now);
        if let Some(previous) = previous {
            self.token_trend = TrendDirection::between(previous, price);
        }
        debug!(price = %format_token_price(price), ?outcome, "token tick");
    }

    fn shuffle_venues(&mut self) {
        if let Some((venue, status)) = self.venues.shuffle() {
            debug!(venue, ?status, "venue status changed");
            self.emit(SimEvent::Venue {
                venue: venue.to_string(),
                status,
            });
        }
        let due = self.now + self.venues.next_delay_ms();
        self.timers.schedule_once(due, Task::VenueShuffle);
    }

    /// Started inside the maintenance window but past its first minute: stay
    /// down until the window closes.
    fn enter_open_window(&mut self) {
        if !self.scheduler.is_running() || !self.scheduler.config().window.contains(self.now) {
            return;
        }
        let transition = self.scheduler.pause_for_window();
        self.log.push("SCHEDULED MAINTENANCE IN PROGRESS");
        self.on_transition(transition);
    }

    /// Adopt the remote control record, then apply the daily window.
    fn sync_store(&mut self) {
        match self.store.as_ref().map(|store| store.load_control()) {
            Some(Ok(Some(record))) => self.adopt_control(record),
            Some(Ok(None)) | None => {}
            Some(Err(err)) => warn!(error = %err, "control store read failed"),
        }

        let Some(transition) = self.scheduler.enforce_daily_window(self.now) else {
            return;
        };
        match transition {
            SchedulerTransition::MaintenanceStarted { .. } => {
                let window = self.scheduler.config().window;
                self.log.push(format!(
                    "SCHEDULED MAINTENANCE: INITIATING REFUEL (TOKYO {:02}:{:02}).",
                    window.start_hour, window.start_minute
                ));
            }
            SchedulerTransition::Resumed => self.log.push("SCHEDULE COMPLETE: SYSTEM RESUMING."),
            _ => {}
        }
        self.write_control(self.scheduler.control_record());
        self.on_transition(transition);
    }

    // ── gating ──────────────────────────────────────────────────────────

    fn on_transition(&mut self, transition: SchedulerTransition) {
        match transition {
            SchedulerTransition::Paused { .. } | SchedulerTransition::MaintenanceStarted { .. } => {
                self.disarm_gated();
                self.cancel_ready();
                self.log.push("SYSTEM PAUSED: REFUELING...");
            }
            SchedulerTransition::Resumed | SchedulerTransition::Restarted => {
                self.cancel_ready();
                self.arm_gated();
                self.log.push("SYSTEM ONLINE: ENGINE RUNNING");
            }
            SchedulerTransition::Ready { until } => {
                self.cancel_ready();
                self.ready_task = Some(self.timers.schedule_once(until, Task::ReadyDelay));
                self.log.push("REFUEL COMPLETE: SYSTEM READY");
            }
        }
        self.emit(SimEvent::Scheduler(transition));
    }

    /// Schedule every gated task that is not already armed.
    fn arm_gated(&mut self) {
        let now = self.now;
        let periodic = [
            (Task::MarketTick, MARKET_TICK_MS),
            (Task::TapeTick, self.config.tape.interval_ms),
            (Task::Indicators, self.config.signals.interval_ms),
            (Task::AssetRotation, ROTATION_MS),
        ];
        for (task, every) in periodic {
            if !self.gated.contains_key(&task) {
                let id = self.timers.schedule_repeating(now + every, every, task);
                self.gated.insert(task, id);
            }
        }
        if !self.gated.contains_key(&Task::Streak) {
            let delay = match self.streak_held.take() {
                Some(held) => held,
                None => self.streak.next_delay_ms(),
            };
            self.schedule_streak(delay);
        }
    }

    /// Cancel every gated task. A pending streak step keeps its remaining
    /// delay for the next `arm_gated`.
    fn disarm_gated(&mut self) {
        if self.gated.contains_key(&Task::Streak) {
            if let Some(due) = self.streak_due.take() {
                self.streak_held = Some((due - self.now).max(0));
            }
        }
        for (_, id) in std::mem::take(&mut self.gated) {
            self.timers.cancel(id);
        }
    }

    fn cancel_ready(&mut self) {
        if let Some(id) = self.ready_task.take() {
            self.timers.cancel(id);
        }
    }

    // ── store ───────────────────────────────────────────────────────────

    fn connect_store(&mut self, store: Box<dyn ControlStore>) {
        let record = match store.load_control() {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "control store unavailable, running offline");
                self.log.push("DATABASE OFFLINE: LOCAL MODE");
                return;
            }
        };

        match store.load_token() {
            Ok(Some(token)) => {
                info!(price = token.price, trend = ?token.trend, "token record present");
            }
            Ok(None) => {
                if let Err(err) = store.save_token(&TokenRecord::initial(self.now)) {
                    warn!(error = %err, "token record initialization failed");
                }
            }
            Err(err) => warn!(error = %err, "token record read failed"),
        }

        self.store = Some(store);
        self.log.push("DATABASE LINK ESTABLISHED");
        if let Some(record) = record {
            self.adopt_control(record);
        }
    }

    fn adopt_control(&mut self, record: ControlRecord) {
        let outcome = self.scheduler.apply_control(record, self.now);
        if let Some(write_back) = outcome.write_back {
            self.write_control(write_back);
        }
        if let Some(transition) = outcome.transition {
            self.on_transition(transition);
        }
    }

    fn write_control(&self, record: ControlRecord) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.save_control(&record) {
            warn!(error = %err, ?record, "control write failed");
        }
    }

    fn emit(&mut self, event: SimEvent) {
        self.events.push(Emitted {
            at: self.now,
            event,
        });
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.now)
            .field("state", &self.scheduler.state())
            .field("online", &self.is_online())
            .field("armed", &self.gated.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
