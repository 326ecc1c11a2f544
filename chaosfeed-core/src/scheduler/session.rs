//! Session scheduler: RUNNING / REFUELING / READY availability state machine.
//!
//! While REFUELING the engine is paused. The pause either has an explicit end
//! time (progress is the elapsed share of the refuel duration) or follows the
//! daily maintenance window (progress is the elapsed share of the window).
//! When the pause is over the scheduler passes through a short READY state
//! before running again.
//!
//! Every method takes `now` explicitly and reports what changed as a
//! [`SchedulerTransition`]; the caller decides what to log, cancel or write.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::window::MaintenanceWindow;
use crate::domain::{ControlRecord, TimestampMs};

pub const REFUEL_DURATION_MS: i64 = 60 * 60 * 1_000;
pub const READY_DELAY_MS: i64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Length of an explicit pause, and the denominator of its progress.
    pub refuel_duration_ms: i64,
    /// How long READY lasts before running again.
    pub ready_delay_ms: i64,
    pub window: MaintenanceWindow,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refuel_duration_ms: REFUEL_DURATION_MS,
            ready_delay_ms: READY_DELAY_MS,
            window: MaintenanceWindow::default(),
        }
    }
}

/// Current availability state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerState {
    Running,
    Refueling { end: Option<TimestampMs> },
    Ready { since: TimestampMs },
}

/// A state change, reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerTransition {
    /// Entered REFUELING on a pause command or control record.
    Paused { end: Option<TimestampMs> },
    /// Entered REFUELING because the daily window opened while running.
    MaintenanceStarted { end: TimestampMs },
    /// Entered RUNNING on a resume command or control record.
    Resumed,
    /// The pause is over; READY until the restart delay elapses.
    Ready { until: TimestampMs },
    /// READY delay elapsed; RUNNING again.
    Restarted,
}

impl SchedulerTransition {
    /// Whether the transition leaves the scheduler in RUNNING.
    pub fn starts_running(&self) -> bool {
        matches!(self, SchedulerTransition::Resumed | SchedulerTransition::Restarted)
    }
}

/// Result of applying a control record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlOutcome {
    pub transition: Option<SchedulerTransition>,
    /// Record to write back to the store, if the contract requires one.
    pub write_back: Option<ControlRecord>,
}

#[derive(Debug, Clone)]
pub struct SessionScheduler {
    config: SchedulerConfig,
    state: SchedulerState,
    progress: f64,
    /// End time of the current explicit pause, kept through READY.
    episode_end: Option<TimestampMs>,
    /// End time of the last explicit pause that is over.
    completed_end: Option<TimestampMs>,
}

impl SessionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: SchedulerState::Running,
            progress: 0.0,
            episode_end: None,
            completed_end: None,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Refuel progress in percent, always within `[0, 100]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// When READY turns back into RUNNING, if READY.
    pub fn ready_deadline(&self) -> Option<TimestampMs> {
        match self.state {
            SchedulerState::Ready { since } => Some(since + self.config.ready_delay_ms),
            _ => None,
        }
    }

    /// The control record that mirrors the local state.
    pub fn control_record(&self) -> ControlRecord {
        match self.state {
            SchedulerState::Running | SchedulerState::Ready { .. } => ControlRecord::running(),
            SchedulerState::Refueling { end } => ControlRecord {
                is_running: false,
                refill_end_time: end,
            },
        }
    }

    /// Pause until `end`, or for the configured refuel duration when `end`
    /// is not supplied.
    pub fn pause(&mut self, now: TimestampMs, end: Option<TimestampMs>) -> SchedulerTransition {
        let end = end.unwrap_or(now + self.config.refuel_duration_ms);
        self.enter_refueling(Some(end));
        info!(end, "scheduler paused");
        SchedulerTransition::Paused { end: Some(end) }
    }

    /// Pause until the daily maintenance window closes. Used when the engine
    /// comes up inside the window, after its start minute has passed.
    pub fn pause_for_window(&mut self) -> SchedulerTransition {
        self.enter_refueling(None);
        info!("scheduler paused until the maintenance window closes");
        SchedulerTransition::Paused { end: None }
    }

    /// Run again immediately. No-op when already running.
    pub fn resume(&mut self) -> Option<SchedulerTransition> {
        if self.is_running() {
            return None;
        }
        self.enter_running();
        info!("scheduler resumed");
        Some(SchedulerTransition::Resumed)
    }

    /// Progress check, evaluated at least once per second while not running.
    ///
    /// Progress never decreases within one pause episode. When the pause is
    /// over, progress is pinned to 100 and the scheduler becomes READY.
    pub fn check(&mut self, now: TimestampMs) -> Option<SchedulerTransition> {
        let end = match self.state {
            SchedulerState::Refueling { end } => end,
            SchedulerState::Running | SchedulerState::Ready { .. } => return None,
        };

        let finished = match end {
            Some(end) => {
                let remaining = end - now;
                let total = self.config.refuel_duration_ms.max(1) as f64;
                let p = (100.0 * (1.0 - remaining as f64 / total)).clamp(0.0, 100.0);
                self.progress = self.progress.max(p);
                remaining <= 0
            }
            None => match self.config.window.progress(now) {
                Some(p) => {
                    self.progress = self.progress.max(p);
                    false
                }
                None => true,
            },
        };

        debug!(progress = self.progress, "refuel progress");
        if !finished {
            return None;
        }
        self.progress = 100.0;
        self.state = SchedulerState::Ready { since: now };
        let until = now + self.config.ready_delay_ms;
        info!(until, "refuel complete, system ready");
        Some(SchedulerTransition::Ready { until })
    }

    /// Leave READY once the restart delay has elapsed.
    pub fn complete_ready(&mut self, now: TimestampMs) -> Option<SchedulerTransition> {
        let deadline = self.ready_deadline()?;
        if now < deadline {
            return None;
        }
        self.enter_running();
        info!("scheduler restarted after ready delay");
        Some(SchedulerTransition::Restarted)
    }

    /// Daily window enforcement, evaluated periodically even while running.
    ///
    /// In the window's first minute a running scheduler is forced into a
    /// one-refuel-duration pause. Outside the window a pause whose end has
    /// already passed is resumed.
    pub fn enforce_daily_window(&mut self, now: TimestampMs) -> Option<SchedulerTransition> {
        let window = self.config.window;
        match self.state {
            SchedulerState::Running if window.is_start_minute(now) => {
                let end = now + self.config.refuel_duration_ms;
                self.enter_refueling(Some(end));
                info!(end, "scheduled maintenance: refuel started");
                Some(SchedulerTransition::MaintenanceStarted { end })
            }
            SchedulerState::Refueling { end: Some(end) } if !window.contains(now) && end < now => {
                self.enter_running();
                info!("scheduled maintenance complete: resuming");
                Some(SchedulerTransition::Resumed)
            }
            _ => None,
        }
    }

    /// Adopt a control record read from the store.
    ///
    /// `isRunning = true` runs locally. `isRunning = false` adopts the
    /// record's end time, or computes one and asks for it to be written back.
    ///
    /// A paused record for an episode that is already over (its end has
    /// passed, or it is the pause that just finished) is stale: a write-back
    /// of the local state failed earlier. It is not adopted again; the local
    /// record is returned for another write attempt instead.
    pub fn apply_control(&mut self, record: ControlRecord, now: TimestampMs) -> ControlOutcome {
        if record.is_running {
            return ControlOutcome {
                transition: self.resume(),
                write_back: None,
            };
        }

        match record.refill_end_time {
            Some(end) if self.episode_end == Some(end) => ControlOutcome::default(),
            Some(end) if self.completed_end == Some(end) || end <= now => {
                debug!(end, "stale control record ignored");
                ControlOutcome {
                    transition: None,
                    write_back: self.mirrored_record(),
                }
            }
            Some(end) => ControlOutcome {
                transition: Some(self.pause(now, Some(end))),
                write_back: None,
            },
            None => {
                match self.state {
                    SchedulerState::Refueling { end: Some(end) } => {
                        return ControlOutcome {
                            transition: None,
                            write_back: Some(ControlRecord::paused_until(end)),
                        };
                    }
                    SchedulerState::Refueling { end: None } => return ControlOutcome::default(),
                    SchedulerState::Running | SchedulerState::Ready { .. } => {}
                }
                let transition = self.pause(now, None);
                ControlOutcome {
                    transition: Some(transition),
                    write_back: Some(self.control_record()),
                }
            }
        }
    }

    /// The local record, unless the pause follows the window and has no end
    /// worth publishing.
    fn mirrored_record(&self) -> Option<ControlRecord> {
        match self.state {
            SchedulerState::Refueling { end: None } => None,
            _ => Some(self.control_record()),
        }
    }

    fn enter_refueling(&mut self, end: Option<TimestampMs>) {
        let same_episode = matches!(self.state, SchedulerState::Refueling { end: e } if e == end);
        if !same_episode {
            self.progress = 0.0;
        }
        self.state = SchedulerState::Refueling { end };
        self.episode_end = end;
    }

    fn enter_running(&mut self) {
        self.state = SchedulerState::Running;
        self.progress = 0.0;
        if let Some(end) = self.episode_end.take() {
            self.completed_end = Some(end);
        }
    }
}

impl Default for SessionScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock;
    use chrono::{TimeZone, Utc};

    const HOUR: i64 = REFUEL_DURATION_MS;

    fn tokyo(hour: u32, minute: u32) -> TimestampMs {
        clock::REFERENCE_TZ
            .with_ymd_and_hms(2024, 1, 10, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
            .timestamp_millis()
    }

    #[test]
    fn starts_running() {
        let mut s = SessionScheduler::default();
        assert!(s.is_running());
        assert_eq!(s.progress(), 0.0);
        assert!(s.check(0).is_none());
    }

    #[test]
    fn pause_defaults_to_refuel_duration() {
        let mut s = SessionScheduler::default();
        let t = s.pause(1_000, None);
        assert_eq!(t, SchedulerTransition::Paused { end: Some(1_000 + HOUR) });
        assert_eq!(s.state(), SchedulerState::Refueling { end: Some(1_000 + HOUR) });
    }

    #[test]
    fn pause_uses_supplied_end() {
        let mut s = SessionScheduler::default();
        s.pause(0, Some(5_000));
        assert_eq!(s.state(), SchedulerState::Refueling { end: Some(5_000) });
    }

    #[test]
    fn progress_is_monotonic_and_reaches_100() {
        let mut s = SessionScheduler::default();
        let start = 10_000_000;
        s.pause(start, None);
        let end = start + HOUR;
        let mut last = 0.0;
        let mut t = start;
        while t < end {
            assert!(s.check(t).is_none());
            let p = s.progress();
            assert!(p >= last && (0.0..=100.0).contains(&p));
            last = p;
            t += 37_000;
        }
        let transition = s.check(end);
        assert_eq!(transition, Some(SchedulerTransition::Ready { until: end + READY_DELAY_MS }));
        assert_eq!(s.progress(), 100.0);
    }

    #[test]
    fn progress_halfway() {
        let mut s = SessionScheduler::default();
        s.pause(0, None);
        s.check(HOUR / 2);
        assert!((s.progress() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn elapsed_end_goes_straight_to_ready() {
        let mut s = SessionScheduler::default();
        let now = 50_000_000;
        s.pause(now, Some(now - 1));
        let t = s.check(now);
        assert_eq!(s.progress(), 100.0);
        assert!(matches!(t, Some(SchedulerTransition::Ready { .. })));
        assert_eq!(s.state(), SchedulerState::Ready { since: now });
    }

    #[test]
    fn end_beyond_duration_clamps_to_zero() {
        let mut s = SessionScheduler::default();
        s.pause(0, Some(3 * HOUR));
        s.check(0);
        assert_eq!(s.progress(), 0.0);
    }

    #[test]
    fn ready_is_transient() {
        let mut s = SessionScheduler::default();
        s.pause(0, Some(1_000));
        s.check(1_000);
        assert_eq!(s.ready_deadline(), Some(1_000 + READY_DELAY_MS));
        assert!(s.complete_ready(2_000).is_none());
        assert_eq!(s.complete_ready(4_000), Some(SchedulerTransition::Restarted));
        assert!(s.is_running());
        assert_eq!(s.progress(), 0.0);
    }

    #[test]
    fn resume_clears_pause() {
        let mut s = SessionScheduler::default();
        s.pause(0, None);
        s.check(HOUR / 4);
        assert_eq!(s.resume(), Some(SchedulerTransition::Resumed));
        assert!(s.is_running());
        assert_eq!(s.progress(), 0.0);
        assert_eq!(s.resume(), None);
    }

    #[test]
    fn windowed_pause_follows_daily_window() {
        let mut s = SessionScheduler::default();
        s.pause_for_window();
        assert!(s.check(tokyo(0, 0)).is_none());
        assert!((s.progress() - 50.0).abs() < 1e-9);
        assert!(matches!(s.check(tokyo(0, 31)), Some(SchedulerTransition::Ready { .. })));
        assert_eq!(s.progress(), 100.0);
    }

    #[test]
    fn windowed_pause_outside_window_is_ready_immediately() {
        let mut s = SessionScheduler::default();
        s.pause_for_window();
        assert!(matches!(s.check(tokyo(12, 0)), Some(SchedulerTransition::Ready { .. })));
    }

    #[test]
    fn daily_window_forces_refuel_at_start() {
        let mut s = SessionScheduler::default();
        assert!(s.enforce_daily_window(tokyo(23, 29)).is_none());
        let now = tokyo(23, 30);
        assert_eq!(
            s.enforce_daily_window(now),
            Some(SchedulerTransition::MaintenanceStarted { end: now + HOUR })
        );
        // Already refueling: a second check in the same minute is a no-op
        assert!(s.enforce_daily_window(now + 10_000).is_none());
    }

    #[test]
    fn daily_window_resumes_elapsed_pause_outside_window() {
        let mut s = SessionScheduler::default();
        let now = tokyo(1, 0);
        s.pause(now - 2 * HOUR, Some(now - 1));
        assert_eq!(s.enforce_daily_window(now), Some(SchedulerTransition::Resumed));
        assert!(s.is_running());
    }

    #[test]
    fn control_record_running_resumes() {
        let mut s = SessionScheduler::default();
        s.pause(0, None);
        let out = s.apply_control(ControlRecord::running(), 10);
        assert_eq!(out.transition, Some(SchedulerTransition::Resumed));
        assert!(out.write_back.is_none());
    }

    #[test]
    fn control_record_paused_without_end_writes_one() {
        let mut s = SessionScheduler::default();
        let rec = ControlRecord {
            is_running: false,
            refill_end_time: None,
        };
        let out = s.apply_control(rec, 1_000);
        assert_eq!(out.write_back, Some(ControlRecord::paused_until(1_000 + HOUR)));
        assert_eq!(s.state(), SchedulerState::Refueling { end: Some(1_000 + HOUR) });
    }

    #[test]
    fn control_record_with_known_end_is_idempotent() {
        let mut s = SessionScheduler::default();
        let rec = ControlRecord::paused_until(HOUR);
        s.apply_control(rec, 0);
        s.check(HOUR / 2);
        let before = s.progress();
        let out = s.apply_control(rec, HOUR / 2);
        assert_eq!(out, ControlOutcome::default());
        assert_eq!(s.progress(), before);

        // Still a no-op while READY for the same episode
        s.check(HOUR);
        assert!(s.apply_control(rec, HOUR + 1).transition.is_none());
        assert!(matches!(s.state(), SchedulerState::Ready { .. }));
    }

    #[test]
    fn finished_episode_record_is_not_readopted() {
        let mut s = SessionScheduler::default();
        let rec = ControlRecord::paused_until(5_000);
        s.apply_control(rec, 0);
        s.check(5_000);
        s.complete_ready(8_000);
        assert!(s.is_running());

        // The running write-back never landed; the store still says paused.
        let out = s.apply_control(rec, 10_000);
        assert!(out.transition.is_none());
        assert_eq!(out.write_back, Some(ControlRecord::running()));
        assert!(s.is_running());
        assert!(s.enforce_daily_window(10_000).is_none());
    }

    #[test]
    fn elapsed_control_record_is_stale() {
        let mut s = SessionScheduler::default();
        let out = s.apply_control(ControlRecord::paused_until(9_000), 10_000);
        assert!(out.transition.is_none());
        assert_eq!(out.write_back, Some(ControlRecord::running()));

        // While refueling on a different episode, the local end is rewritten.
        s.pause(10_000, Some(20_000));
        let out = s.apply_control(ControlRecord::paused_until(9_000), 11_000);
        assert_eq!(out.write_back, Some(ControlRecord::paused_until(20_000)));
        assert_eq!(s.state(), SchedulerState::Refueling { end: Some(20_000) });
    }

    #[test]
    fn windowed_pause_ignores_endless_record() {
        let mut s = SessionScheduler::default();
        s.pause_for_window();
        let rec = ControlRecord {
            is_running: false,
            refill_end_time: None,
        };
        assert_eq!(s.apply_control(rec, tokyo(0, 0)), ControlOutcome::default());
        assert_eq!(s.state(), SchedulerState::Refueling { end: None });
    }

    #[test]
    fn mirrored_control_record() {
        let mut s = SessionScheduler::default();
        assert_eq!(s.control_record(), ControlRecord::running());
        s.pause(0, Some(42));
        assert_eq!(s.control_record(), ControlRecord::paused_until(42));
    }
}
