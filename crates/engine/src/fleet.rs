//! Owns every simulated miner and exposes a concurrency-safe control surface.
//!
//! Grounded on the teacher's `SessionManager`: an `Arc<RwLock<HashMap<...>>>`
//! fleet-wide map plus a per-entry lock, exactly the same two-tier locking
//! discipline `session_manager.rs` uses for `sessions`.

use crate::clock::Clock;
use crate::engine;
use crate::error::{FleetError, Result};
use crate::preset::{ModelPresetView, PresetCatalog};
use crate::state::{ConfigPatch, MinerState};
use crate::telemetry::{self, TelemetrySnapshot};
use crate::{config as config_surface, prng::Prng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// One entry in the fleet map: the per-miner lock plus the identifiers
/// needed to resolve its presets without holding the fleet lock.
struct MinerSlot {
    model_id: String,
    scenario_id: String,
    state: Mutex<MinerState>,
}

/// Summary row returned by [`FleetRuntime::list`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct MinerSummary {
    pub miner_id: String,
    pub model_id: String,
    pub scenario_id: String,
}

/// The result of a config patch: which fields were actually enqueued, and
/// which were rejected (with reasons).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PatchOutcome {
    pub applied: bool,
    pub violations: Vec<crate::error::ConfigViolation>,
}

/// Owns all miners, runs ticks, and serializes mutations.
///
/// Mirrors the teacher's `SessionManager`, generalized from "processes
/// wrapping real subprocesses" to "in-memory simulated state".
pub struct FleetRuntime {
    miners: Arc<RwLock<HashMap<String, Arc<MinerSlot>>>>,
    catalog: PresetCatalog,
    clock: Arc<dyn Clock>,
    next_id: AtomicU64,
    max_miners: usize,
}

impl FleetRuntime {
    pub fn new(catalog: PresetCatalog, clock: Arc<dyn Clock>, max_miners: usize) -> Self {
        Self {
            miners: Arc::new(RwLock::new(HashMap::new())),
            catalog,
            clock,
            next_id: AtomicU64::new(1),
            max_miners,
        }
    }

    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    pub fn list_models(&self) -> Vec<ModelPresetView> {
        self.catalog.list_models()
    }

    pub fn list_scenarios(&self) -> Vec<String> {
        self.catalog.list_scenario_ids()
    }

    pub async fn list(&self) -> Vec<MinerSummary> {
        let miners = self.miners.read().await;
        let mut rows: Vec<_> = miners
            .iter()
            .map(|(id, slot)| MinerSummary {
                miner_id: id.clone(),
                model_id: slot.model_id.clone(),
                scenario_id: slot.scenario_id.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.miner_id.cmp(&b.miner_id));
        rows
    }

    pub async fn create(&self, model_id: &str, scenario_id: &str) -> Result<String> {
        let model = self
            .catalog
            .model(model_id)
            .ok_or_else(|| FleetError::ModelNotFound(model_id.to_string()))?;
        let scenario = self
            .catalog
            .scenario(scenario_id)
            .ok_or_else(|| FleetError::ScenarioNotFound(scenario_id.to_string()))?;

        let mut miners = self.miners.write().await;
        if miners.len() >= self.max_miners {
            return Err(FleetError::FleetBusy { max_miners: self.max_miners });
        }

        let miner_id = self.next_miner_id();
        let now = self.clock.now_secs();
        let seed = Prng::seed_from(&miner_id, (now * 1e9) as u64);
        let connect_delay_s = {
            let mut seed_rng = Prng::new(seed);
            scenario.connect_delay_min_s
                + seed_rng.next_f64() * (scenario.connect_delay_max_s - scenario.connect_delay_min_s).max(0.0)
        };

        let state = MinerState::new(
            miner_id.clone(),
            model_id.to_string(),
            scenario_id.to_string(),
            now,
            scenario.ambient_override_c.unwrap_or(model.ambient_c_default),
            model.core_voltage_mv,
            model.frequency_mhz,
            seed,
            connect_delay_s,
        );

        miners.insert(
            miner_id.clone(),
            Arc::new(MinerSlot {
                model_id: model_id.to_string(),
                scenario_id: scenario_id.to_string(),
                state: Mutex::new(state),
            }),
        );
        info!(miner_id = %miner_id, model_id, scenario_id, "miner created");
        Ok(miner_id)
    }

    pub async fn delete(&self, miner_id: &str) -> Result<()> {
        let mut miners = self.miners.write().await;
        if miners.remove(miner_id).is_none() {
            return Err(FleetError::MinerNotFound(miner_id.to_string()));
        }
        info!(miner_id, "miner deleted");
        Ok(())
    }

    pub async fn snapshot(&self, miner_id: &str) -> Result<TelemetrySnapshot> {
        let slot = self.resolve(miner_id).await?;
        let model = self
            .catalog
            .model(&slot.model_id)
            .expect("model_id on an existing slot is always resolvable");
        let state = slot.state.lock().await;
        Ok(telemetry::snapshot(&state, model, self.clock.now_secs()))
    }

    pub async fn patch_config(&self, miner_id: &str, patch: ConfigPatch) -> Result<PatchOutcome> {
        let slot = self.resolve(miner_id).await?;
        let model = self
            .catalog
            .model(&slot.model_id)
            .expect("model_id on an existing slot is always resolvable");
        let (sanitized, violations) = config_surface::validate(&patch, model);
        let applied = !sanitized.is_empty();
        if applied {
            let mut state = slot.state.lock().await;
            config_surface::enqueue(&mut state, sanitized);
        }
        if !violations.is_empty() {
            debug!(miner_id, violations = ?violations, "config patch had rejected fields");
        }
        if !applied && !violations.is_empty() {
            return Err(FleetError::InvalidConfig { violations });
        }
        Ok(PatchOutcome { applied, violations })
    }

    pub async fn restart(&self, miner_id: &str) -> Result<()> {
        let slot = self.resolve(miner_id).await?;
        let scenario = self
            .catalog
            .scenario(&slot.scenario_id)
            .expect("scenario_id on an existing slot is always resolvable");
        let mut state = slot.state.lock().await;
        state.restart_countdown_s = scenario.restart_duration_s;
        info!(miner_id, "restart requested");
        Ok(())
    }

    /// Advances every miner by its own elapsed time since `last_tick_at`.
    /// Miners deleted between the snapshot of ids and lock acquisition are
    /// silently skipped, per the lock discipline in SPEC_FULL.md §5.
    pub async fn tick_all(&self, now: f64) {
        let slots: Vec<Arc<MinerSlot>> = {
            let miners = self.miners.read().await;
            miners.values().cloned().collect()
        };

        for slot in slots {
            let model = match self.catalog.model(&slot.model_id) {
                Some(m) => m,
                None => continue,
            };
            let scenario = match self.catalog.scenario(&slot.scenario_id) {
                Some(s) => s,
                None => continue,
            };
            let mut state = slot.state.lock().await;
            let dt = (now - state.last_tick_at).max(0.0);
            engine::advance(&mut state, dt, model, scenario);
            state.last_tick_at = now;
        }
    }

    async fn resolve(&self, miner_id: &str) -> Result<Arc<MinerSlot>> {
        let miners = self.miners.read().await;
        miners
            .get(miner_id)
            .cloned()
            .ok_or_else(|| FleetError::MinerNotFound(miner_id.to_string()))
    }

    fn next_miner_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("m_{n:03}")
    }
}

impl std::fmt::Debug for FleetRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetRuntime").field("max_miners", &self.max_miners).finish()
    }
}
