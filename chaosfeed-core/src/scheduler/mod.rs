//! Session availability scheduling.

pub mod session;
pub mod window;

pub use session::{
    ControlOutcome, SchedulerConfig, SchedulerState, SchedulerTransition, SessionScheduler,
    READY_DELAY_MS, REFUEL_DURATION_MS,
};
pub use window::MaintenanceWindow;
