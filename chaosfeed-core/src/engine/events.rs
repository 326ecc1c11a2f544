//! Events emitted by the simulation.

use serde::{Deserialize, Serialize};

use crate::domain::TimestampMs;
use crate::scheduler::SchedulerTransition;
use crate::simulators::{Consensus, StreakEvent, TradePrint, VenueStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Scheduler(SchedulerTransition),
    Streak(StreakEvent),
    Consensus(Consensus),
    Trade(TradePrint),
    Venue { venue: String, status: VenueStatus },
    AssetSwitched { symbol: String },
}

impl SimEvent {
    /// Short stable name, used for counting and filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::Scheduler(_) => "scheduler",
            SimEvent::Streak(_) => "streak",
            SimEvent::Consensus(_) => "consensus",
            SimEvent::Trade(_) => "trade",
            SimEvent::Venue { .. } => "venue",
            SimEvent::AssetSwitched { .. } => "asset",
        }
    }
}

/// An event and the simulated time it happened at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emitted {
    pub at: TimestampMs,
    pub event: SimEvent,
}
