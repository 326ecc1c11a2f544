//! Simulation engine: the timer-driven aggregate over every component.
//!
//! A [`Simulation`] owns the feeds, the scheduler and the simulators, plus a
//! [`TimerQueue`](crate::timer::TimerQueue) of their periodic tasks. Driving
//! it is a matter of calling [`Simulation::advance_to`] with a timestamp:
//!
//! 1. Pop every task due at or before that time, in `(due, sequence)` order
//! 2. Re-check gating against the scheduler at fire time
//! 3. Run the task, rescheduling one-shot chains (streak, venues)
//! 4. Return the events emitted along the way
//!
//! The engine never reads a clock, so a live driver and a fast-forward
//! replay produce the same run for the same seed and timestamps.

pub mod events;
pub mod simulation;

pub use events::{Emitted, SimEvent};
pub use simulation::{
    Simulation, Status, Task, MARKET_TICK_MS, ROTATION_MS, SCHEDULER_CHECK_MS, STORE_SYNC_MS,
    TOKEN_TICK_MS,
};
