//! Mutable physical/operational state of a single simulated miner.

use crate::prng::Prng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    Connecting,
    Connected,
    Reconnecting,
    Mining,
    Restarting,
}

impl Default for PoolState {
    fn default() -> Self {
        Self::Connecting
    }
}

/// Live, mutable configuration knobs. Distinct from [`ConfigPatch`], which is
/// the raw (possibly partial, possibly invalid) input from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    pub core_voltage_mv: u32,
    pub frequency_mhz: u32,
    pub autofanspeed: bool,
    pub targettemp_c: f64,
    pub manual_fan_percent: f64,
}

/// A partial, caller-supplied config update. Every field is optional and
/// independently validated by [`crate::config::ConfigSurface::validate`].
/// Unknown JSON keys are dropped by `serde` at the HTTP boundary before this
/// type is ever constructed, matching the "unknown keys ignored" rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default)]
    pub core_voltage: Option<i64>,
    #[serde(default)]
    pub frequency: Option<i64>,
    #[serde(default)]
    pub autofanspeed: Option<i64>,
    #[serde(default)]
    pub targettemp: Option<f64>,
    #[serde(default)]
    pub manual_fan_percent: Option<f64>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.core_voltage.is_none()
            && self.frequency.is_none()
            && self.autofanspeed.is_none()
            && self.targettemp.is_none()
            && self.manual_fan_percent.is_none()
    }

    /// Overwrite fields present in `other`, leaving `self`'s other fields
    /// untouched (later patch wins on overlap, per-field).
    pub fn merge_from(&mut self, other: &ConfigPatch) {
        if other.core_voltage.is_some() {
            self.core_voltage = other.core_voltage;
        }
        if other.frequency.is_some() {
            self.frequency = other.frequency;
        }
        if other.autofanspeed.is_some() {
            self.autofanspeed = other.autofanspeed;
        }
        if other.targettemp.is_some() {
            self.targettemp = other.targettemp;
        }
        if other.manual_fan_percent.is_some() {
            self.manual_fan_percent = other.manual_fan_percent;
        }
    }
}

/// Full mutable state of one simulated miner.
pub struct MinerState {
    pub miner_id: String,
    pub model_id: String,
    pub scenario_id: String,
    pub created_at: f64,

    pub pool_state: PoolState,
    pub uptime_seconds: f64,
    pub shares_accepted: u64,
    pub shares_rejected: u64,
    pub best_difficulty: f64,

    pub chip_temp_c: f64,
    pub vr_temp_c: f64,
    pub ambient_c: f64,
    pub fan_percent: f64,
    pub fan_rpm: f64,
    pub hashrate_ghs: f64,
    pub power_w: f64,
    pub error_percentage: f64,

    pub config: MinerConfig,

    pub ramp_progress: f64,
    pub prng: Prng,
    pub pending_config: ConfigPatch,
    pub last_tick_at: f64,

    /// Seconds remaining until a restart completes; 0 when not restarting.
    pub restart_countdown_s: f64,
    /// Seconds remaining until `connecting` resolves to `mining`.
    pub connect_countdown_s: f64,
    /// Seconds remaining until `reconnecting` resolves back to `mining`.
    pub reconnect_countdown_s: f64,
    /// Anti-windup-clamped integral term for the fan PI controller.
    pub fan_integral: f64,
}

impl MinerState {
    pub fn new(
        miner_id: String,
        model_id: String,
        scenario_id: String,
        created_at: f64,
        ambient_c: f64,
        nominal_core_voltage_mv: u32,
        nominal_frequency_mhz: u32,
        seed: u64,
        connect_delay_s: f64,
    ) -> Self {
        Self {
            miner_id: miner_id.clone(),
            model_id,
            scenario_id,
            created_at,
            pool_state: PoolState::Connecting,
            uptime_seconds: 0.0,
            shares_accepted: 0,
            shares_rejected: 0,
            best_difficulty: 0.0,
            chip_temp_c: ambient_c,
            vr_temp_c: ambient_c,
            ambient_c,
            fan_percent: 30.0,
            fan_rpm: 0.0,
            hashrate_ghs: 0.0,
            power_w: 0.0,
            error_percentage: 0.0,
            config: MinerConfig {
                core_voltage_mv: nominal_core_voltage_mv,
                frequency_mhz: nominal_frequency_mhz,
                autofanspeed: true,
                targettemp_c: 65.0,
                manual_fan_percent: 50.0,
            },
            ramp_progress: 0.0,
            prng: Prng::new(seed),
            pending_config: ConfigPatch::default(),
            last_tick_at: created_at,
            restart_countdown_s: 0.0,
            connect_countdown_s: connect_delay_s,
            reconnect_countdown_s: 0.0,
            fan_integral: 0.0,
        }
    }
}
