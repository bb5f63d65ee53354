//! Process-level settings for a running fleet.
//!
//! Shaped like the teacher's `ThreadBudgetSettings`/`AppConfig`: a small
//! `Serialize`/`Deserialize` struct with a sensible `Default`. Unlike the
//! teacher's `AppConfig`, this one is never persisted to disk — state is
//! process-lifetime only (Non-goal: persistence across restarts), so callers
//! construct it in-process from env/CLI (the demo binary) or directly in
//! tests, then hand it to `FleetRuntime::new`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// How often the tick worker calls `FleetRuntime::tick_all`.
    pub tick_cadence_ms: u64,
    /// Upper bound on concurrently live miners; `create` fails past this.
    pub max_miners: usize,
}

impl FleetConfig {
    pub fn tick_cadence(&self) -> Duration {
        Duration::from_millis(self.tick_cadence_ms)
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self { tick_cadence_ms: 1_000, max_miners: 256 }
    }
}
