//! Operator commands against a control store.
//!
//! These write the same documents a running engine polls, so a pause issued
//! here is adopted by every engine sharing the store on its next sync.

use anyhow::{Context, Result};
use serde::Serialize;

use chaosfeed_core::domain::{ControlRecord, TimestampMs, TokenRecord};
use chaosfeed_core::ControlStore;

/// What the store currently says.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    pub control: Option<ControlRecord>,
    pub token: Option<TokenRecord>,
    /// Milliseconds until the stored refuel ends, when paused.
    pub remaining_ms: Option<i64>,
}

/// Pause until `end`, or for `refuel_duration_ms` from `now`.
pub fn pause(
    store: &dyn ControlStore,
    now: TimestampMs,
    end: Option<TimestampMs>,
    refuel_duration_ms: i64,
) -> Result<ControlRecord> {
    let record = ControlRecord::paused_until(end.unwrap_or(now + refuel_duration_ms));
    store
        .save_control(&record)
        .context("failed to write pause record")?;
    tracing::info!(end = ?record.refill_end_time, "pause written");
    Ok(record)
}

pub fn resume(store: &dyn ControlStore) -> Result<ControlRecord> {
    let record = ControlRecord::running();
    store
        .save_control(&record)
        .context("failed to write running record")?;
    tracing::info!("resume written");
    Ok(record)
}

pub fn status(store: &dyn ControlStore, now: TimestampMs) -> Result<StoreStatus> {
    let control = store.load_control().context("failed to read control record")?;
    let token = store.load_token().context("failed to read token record")?;
    let remaining_ms = control
        .filter(|c| !c.is_running)
        .and_then(|c| c.refill_end_time)
        .map(|end| (end - now).max(0));
    Ok(StoreStatus {
        control,
        token,
        remaining_ms,
    })
}
