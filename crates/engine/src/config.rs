//! Validates and applies live config patches.
//!
//! Validation and application are split so the fleet can batch application
//! inside the tick (see the engine's `advance` step 1): this removes any
//! TOCTOU window between a telemetry reader and a config writer, and keeps
//! the simulation a pure function of `(state_t, dt, config_t)`.

use crate::error::ConfigViolation;
use crate::preset::ModelPreset;
use crate::state::{ConfigPatch, MinerState};

const TARGET_TEMP_MIN_C: f64 = 30.0;
const TARGET_TEMP_MAX_C: f64 = 90.0;
const MANUAL_FAN_MIN_PCT: f64 = 0.0;
const MANUAL_FAN_MAX_PCT: f64 = 100.0;

/// Validates a raw patch against a model's bounds and produces a sanitized
/// patch containing only the fields that passed.
///
/// Policy: an out-of-range field is rejected outright (not clamped-and-
/// enqueued) so that a single invalid field never silently changes committed
/// telemetry; see SPEC_FULL.md §4.2 for the rationale. Fields that pass
/// validation in the same call are still enqueued, per the per-field
/// acceptance policy.
pub fn validate(patch: &ConfigPatch, model: &ModelPreset) -> (ConfigPatch, Vec<ConfigViolation>) {
    let mut sanitized = ConfigPatch::default();
    let mut violations = Vec::new();

    if let Some(cv) = patch.core_voltage {
        if cv >= model.core_voltage_min_mv as i64 && cv <= model.core_voltage_max_mv as i64 {
            sanitized.core_voltage = Some(cv);
        } else {
            violations.push(ConfigViolation::out_of_range("coreVoltage"));
        }
    }

    if let Some(freq) = patch.frequency {
        if freq >= model.freq_min_mhz as i64 && freq <= model.freq_max_mhz as i64 {
            sanitized.frequency = Some(freq);
        } else {
            violations.push(ConfigViolation::out_of_range("frequency"));
        }
    }

    if let Some(auto) = patch.autofanspeed {
        if auto == 0 || auto == 1 {
            sanitized.autofanspeed = Some(auto);
        } else {
            violations.push(ConfigViolation::invalid("autofanspeed", "must_be_0_or_1"));
        }
    }

    if let Some(target) = patch.targettemp {
        if target.is_finite() && (TARGET_TEMP_MIN_C..=TARGET_TEMP_MAX_C).contains(&target) {
            sanitized.targettemp = Some(target);
        } else {
            violations.push(ConfigViolation::out_of_range("targettemp"));
        }
    }

    if let Some(fan) = patch.manual_fan_percent {
        if fan.is_finite() && (MANUAL_FAN_MIN_PCT..=MANUAL_FAN_MAX_PCT).contains(&fan) {
            sanitized.manual_fan_percent = Some(fan);
        } else {
            violations.push(ConfigViolation::out_of_range("manualFanPercent"));
        }
    }

    (sanitized, violations)
}

/// Stores a sanitized patch in `state.pending_config`, overwriting any field
/// already pending. No visible state changes until the next tick applies it.
pub fn enqueue(state: &mut MinerState, sanitized: ConfigPatch) {
    state.pending_config.merge_from(&sanitized);
}
