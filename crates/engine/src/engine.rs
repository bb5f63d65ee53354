//! The per-miner physical/behavioral simulation.
//!
//! `advance` is a pure-ish function of `(state, dt, model, scenario)`: the
//! only external input is the caller-supplied `dt` and whatever is already
//! queued in `state.pending_config` / `state.prng`. This is what makes the
//! tick worker the sole place real time enters the system (SPEC_FULL.md
//! design notes, "cooperative tick with explicit dt").

use crate::preset::{ModelPreset, ScenarioPreset};
use crate::state::{MinerState, PoolState};
use tracing::{debug, info, warn};

/// Hard clamp on a single tick's elapsed time, so a paused process (or a
/// slow previous tick) never produces an explosive step.
pub const MAX_DT_S: f64 = 5.0;

const TAU_RAMP_UP_S: f64 = 30.0;
const TAU_RAMP_DOWN_S: f64 = 3.0;

/// Fraction of nominal power drawn at rampProgress = 0 (fans/controller/idle
/// ASICs). Calibrated so `P(nominal config, rampProgress=1) ==
/// power_w_at_nominal` exactly, per the spec's open-question resolution.
const IDLE_POWER_FRACTION: f64 = 0.04;

/// Fan cooling authority, relative to the preset's own conductance (1/R).
/// At fanPercent=100 the effective conductance is `1 + FAN_CONDUCTANCE_GAIN`
/// times the natural (fan-off) conductance.
const FAN_CONDUCTANCE_GAIN: f64 = 20.0;

const FAN_BASELINE_PCT: f64 = 30.0;
const FAN_MIN_PCT: f64 = 10.0;
const FAN_MAX_PCT: f64 = 100.0;
const FAN_KP: f64 = 8.0;
const FAN_KI: f64 = 0.2;
const FAN_INTEGRAL_CLAMP: f64 = 15.0;
const FAN_HARD_CEILING_OFFSET_C: f64 = 15.0;

/// Shares/sec per GH/s of instantaneous hashrate. Not calibrated against any
/// real pool difficulty (Non-goal: cryptographic correctness) — chosen only
/// to produce a believable, visible share cadence across the bundled
/// presets' hashrate range.
const SHARE_RATE_PER_GHS: f64 = 0.0003;
const ERROR_EWMA_ALPHA: f64 = 0.2;

/// Advances one miner's state by `dt` seconds. `dt` is clamped to
/// `[0, MAX_DT_S]` internally, so callers may pass an unclamped wall-clock
/// delta.
pub fn advance(
    state: &mut MinerState,
    dt: f64,
    model: &ModelPreset,
    scenario: &ScenarioPreset,
) {
    let dt = dt.clamp(0.0, MAX_DT_S);

    apply_pending_config(state, model);
    handle_restart(state, dt, scenario);
    run_pool_state_machine(state, dt, scenario);
    step_hashrate_ramp(state, dt, model, scenario);
    step_power(state, model);
    step_thermal(state, dt, model, scenario);
    step_fan_control(state, model);
    step_shares_and_errors(state, dt, scenario);
    step_uptime(state, dt);

    recover_non_finite_fields(state, model);
}

fn apply_pending_config(state: &mut MinerState, model: &ModelPreset) {
    let patch = std::mem::take(&mut state.pending_config);
    if let Some(cv) = patch.core_voltage {
        state.config.core_voltage_mv =
            (cv as u32).clamp(model.core_voltage_min_mv, model.core_voltage_max_mv);
    }
    if let Some(freq) = patch.frequency {
        state.config.frequency_mhz = (freq as u32).clamp(model.freq_min_mhz, model.freq_max_mhz);
    }
    if let Some(auto) = patch.autofanspeed {
        state.config.autofanspeed = auto == 1;
    }
    if let Some(target) = patch.targettemp {
        state.config.targettemp_c = target;
    }
    if let Some(fan) = patch.manual_fan_percent {
        state.config.manual_fan_percent = fan.clamp(0.0, 100.0);
    }
}

fn handle_restart(state: &mut MinerState, dt: f64, scenario: &ScenarioPreset) {
    if state.restart_countdown_s <= 0.0 {
        return;
    }
    state.pool_state = PoolState::Restarting;
    state.restart_countdown_s = (state.restart_countdown_s - dt).max(0.0);
    if state.restart_countdown_s == 0.0 {
        state.pool_state = PoolState::Connecting;
        state.connect_countdown_s = sample_connect_delay(state, scenario);
    }
}

fn run_pool_state_machine(state: &mut MinerState, dt: f64, scenario: &ScenarioPreset) {
    match state.pool_state {
        PoolState::Restarting => {
            // Fully handled by `handle_restart`.
        }
        PoolState::Connecting => {
            state.connect_countdown_s = (state.connect_countdown_s - dt).max(0.0);
            if state.connect_countdown_s <= 0.0 {
                state.pool_state = PoolState::Mining;
                debug!(miner_id = %state.miner_id, "pool state connecting -> mining");
            }
        }
        PoolState::Mining => {
            let disconnect_prob = (scenario.disconnect_rate_per_s * dt).clamp(0.0, 1.0);
            if state.prng.next_bool(disconnect_prob) {
                state.pool_state = PoolState::Reconnecting;
                state.reconnect_countdown_s = sample_exponential(state, scenario.mttr_s);
                warn!(miner_id = %state.miner_id, "pool state mining -> reconnecting");
            }
        }
        PoolState::Reconnecting => {
            state.reconnect_countdown_s = (state.reconnect_countdown_s - dt).max(0.0);
            if state.reconnect_countdown_s <= 0.0 {
                state.pool_state = PoolState::Mining;
                info!(miner_id = %state.miner_id, "pool state reconnecting -> mining");
            }
        }
        PoolState::Connected => {
            // Unreachable by this engine's transitions; kept in the public
            // enum for API completeness (see SPEC_FULL.md §9).
        }
    }
}

fn sample_connect_delay(state: &mut MinerState, scenario: &ScenarioPreset) -> f64 {
    let span = (scenario.connect_delay_max_s - scenario.connect_delay_min_s).max(0.0);
    scenario.connect_delay_min_s + state.prng.next_f64() * span
}

fn sample_exponential(state: &mut MinerState, mean: f64) -> f64 {
    let u = state.prng.next_f64().max(f64::MIN_POSITIVE);
    -mean * u.ln()
}

/// `f(frequency, coreVoltage)`: linear in frequency, sub-linear in voltage,
/// `f(nominal) == 1`. The exact curve is a preset-supplied hook per the
/// spec's open question — this implementation calibrates it only at the
/// nominal point, as instructed.
fn frequency_voltage_factor(model: &ModelPreset, frequency_mhz: u32, core_voltage_mv: u32) -> f64 {
    let freq_ratio = frequency_mhz as f64 / model.frequency_mhz as f64;
    let voltage_ratio = core_voltage_mv as f64 / model.core_voltage_mv as f64;
    freq_ratio * voltage_ratio.powf(model.voltage_exponent)
}

fn step_hashrate_ramp(
    state: &mut MinerState,
    dt: f64,
    model: &ModelPreset,
    scenario: &ScenarioPreset,
) {
    let is_mining = state.pool_state == PoolState::Mining;
    let tau = if is_mining { TAU_RAMP_UP_S } else { TAU_RAMP_DOWN_S };
    let target_progress = if is_mining { 1.0 } else { 0.0 };
    let alpha = 1.0 - (-dt / tau).exp();
    state.ramp_progress += (target_progress - state.ramp_progress) * alpha;
    state.ramp_progress = state.ramp_progress.clamp(0.0, 1.0);

    if !is_mining {
        state.hashrate_ghs = 0.0;
        return;
    }

    let f = frequency_voltage_factor(model, state.config.frequency_mhz, state.config.core_voltage_mv);
    let nominal_hashrate =
        model.asic_count as f64 * model.hashrate_per_chip_ghs_at_nominal * f;
    let jitter = state.prng.next_gaussian_scaled(0.0, scenario.hashrate_jitter_sigma);
    state.hashrate_ghs = (nominal_hashrate * state.ramp_progress * (1.0 + jitter)).max(0.0);
}

fn step_power(state: &mut MinerState, model: &ModelPreset) {
    let p_idle = model.power_w_at_nominal * IDLE_POWER_FRACTION;
    let k_dyn = model.power_w_at_nominal - p_idle;
    let freq_ratio = state.config.frequency_mhz as f64 / model.frequency_mhz as f64;
    let voltage_ratio = state.config.core_voltage_mv as f64 / model.core_voltage_mv as f64;
    state.power_w = p_idle + k_dyn * freq_ratio * voltage_ratio.powi(2) * state.ramp_progress;
}

fn step_thermal(state: &mut MinerState, dt: f64, model: &ModelPreset, scenario: &ScenarioPreset) {
    let ambient = scenario.ambient_override_c.unwrap_or(model.ambient_c_default);
    state.ambient_c = ambient;

    let delta = state.chip_temp_c - ambient;
    let conduction = delta / model.thermal_resistance_c_per_w;
    let fan_term = FAN_CONDUCTANCE_GAIN * (state.fan_percent / 100.0) * delta;
    let heat_out = conduction + fan_term;
    let thermal_noise = state.prng.next_gaussian_scaled(0.0, scenario.thermal_noise_sigma);

    state.chip_temp_c +=
        dt * (state.power_w - heat_out) / model.thermal_mass_j_per_c + thermal_noise;

    let vr_noise = state.prng.next_gaussian_scaled(0.0, scenario.thermal_noise_sigma * 0.3);
    state.vr_temp_c = state.chip_temp_c + model.vr_offset_c + vr_noise.abs();
}

fn step_fan_control(state: &mut MinerState, model: &ModelPreset) {
    if state.config.autofanspeed {
        let error = state.chip_temp_c - state.config.targettemp_c;
        state.fan_integral =
            (state.fan_integral + error).clamp(-FAN_INTEGRAL_CLAMP, FAN_INTEGRAL_CLAMP);
        let mut fan = FAN_BASELINE_PCT + FAN_KP * error + FAN_KI * state.fan_integral;
        fan = fan.clamp(FAN_MIN_PCT, FAN_MAX_PCT);
        if state.chip_temp_c > state.config.targettemp_c + FAN_HARD_CEILING_OFFSET_C {
            fan = FAN_MAX_PCT;
        }
        state.fan_percent = fan;
    } else {
        state.fan_percent = state.config.manual_fan_percent.clamp(0.0, 100.0);
    }
    state.fan_rpm = (state.fan_percent / 100.0) * model.fan_max_rpm as f64;
}

fn step_shares_and_errors(state: &mut MinerState, dt: f64, scenario: &ScenarioPreset) {
    if state.pool_state != PoolState::Mining {
        state.error_percentage = state.error_percentage.max(scenario.error_floor_pct);
        return;
    }

    let lambda_accept = state.hashrate_ghs * SHARE_RATE_PER_GHS * dt;
    let lambda_reject = lambda_accept * scenario.reject_bias;

    let accepted = state.prng.next_poisson(lambda_accept);
    let rejected = state.prng.next_poisson(lambda_reject);

    state.shares_accepted += accepted;
    state.shares_rejected += rejected;

    if accepted > 0 || rejected > 0 {
        let sample_ratio = rejected as f64 / (accepted + rejected) as f64 * 100.0;
        state.error_percentage =
            ERROR_EWMA_ALPHA * sample_ratio + (1.0 - ERROR_EWMA_ALPHA) * state.error_percentage;
    }
    state.error_percentage = state.error_percentage.clamp(scenario.error_floor_pct, 100.0);

    if accepted > 0 || rejected > 0 {
        // bestDifficulty is a display figure; nudge it with the share
        // cadence so it is not permanently zero in a healthy fleet.
        state.best_difficulty = state.best_difficulty.max(state.hashrate_ghs * 10.0);
    }
}

fn step_uptime(state: &mut MinerState, dt: f64) {
    if state.pool_state != PoolState::Restarting {
        state.uptime_seconds += dt;
    }
}

/// Resets any field that went non-finite back to its nominal value, and logs
/// the fault. One miner's numerical blow-up must never abort the fleet's
/// tick (SPEC_FULL.md §7).
fn recover_non_finite_fields(state: &mut MinerState, model: &ModelPreset) {
    if !state.chip_temp_c.is_finite() {
        warn!(miner_id = %state.miner_id, "chip temperature went non-finite, resetting to ambient");
        state.chip_temp_c = state.ambient_c;
        state.fan_integral = 0.0;
    }
    if !state.vr_temp_c.is_finite() {
        state.vr_temp_c = state.chip_temp_c + model.vr_offset_c;
    }
    if !state.hashrate_ghs.is_finite() || state.hashrate_ghs < 0.0 {
        warn!(miner_id = %state.miner_id, "hashrate went non-finite, resetting to zero");
        state.hashrate_ghs = 0.0;
        state.ramp_progress = 0.0;
    }
    if !state.power_w.is_finite() {
        state.power_w = model.power_w_at_nominal * IDLE_POWER_FRACTION;
    }
    if !state.fan_percent.is_finite() {
        state.fan_percent = FAN_BASELINE_PCT;
        state.fan_integral = 0.0;
    }
    if !state.error_percentage.is_finite() {
        state.error_percentage = 0.0;
    }
}
