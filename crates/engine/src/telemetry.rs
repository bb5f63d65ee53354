//! Read-only projection of [`MinerState`] for external callers.

use crate::preset::ModelPreset;
use crate::state::MinerState;
use serde::{Deserialize, Serialize};

/// Flat telemetry record. Field names match the wire contract verbatim
/// (SPEC_FULL.md §6) so an HTTP layer built on top of this crate can
/// `serde_json::to_value` it directly with no renaming glue. The wire
/// contract is not a uniform case convention (it mixes `miner_id` with
/// `hashRate` and `fanspeed`) because it mirrors the field names real ASIC
/// firmware HTTP APIs already use, so each field is renamed individually
/// rather than via a blanket `rename_all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub miner_id: String,
    #[serde(rename = "hashRate")]
    pub hash_rate: f64,
    pub temp: f64,
    #[serde(rename = "vrTemp")]
    pub vr_temp: f64,
    pub power: f64,
    pub fanspeed: f64,
    pub fanrpm: f64,
    #[serde(rename = "coreVoltage")]
    pub core_voltage: u32,
    pub frequency: u32,
    #[serde(rename = "errorPercentage")]
    pub error_percentage: f64,
    #[serde(rename = "sharesAccepted")]
    pub shares_accepted: u64,
    #[serde(rename = "sharesRejected")]
    pub shares_rejected: u64,
    #[serde(rename = "poolState")]
    pub pool_state: crate::state::PoolState,
    #[serde(rename = "uptimeSeconds")]
    pub uptime_seconds: f64,
    pub voltage: u8,
    pub targettemp: f64,
    pub autofanspeed: bool,
    pub timestamp: f64,
}

/// Projects a snapshot from live state. `now` is the caller-supplied
/// timestamp (unix seconds) rather than something this function reads
/// itself, keeping it a pure function of its inputs.
pub fn snapshot(state: &MinerState, model: &ModelPreset, now: f64) -> TelemetrySnapshot {
    TelemetrySnapshot {
        miner_id: state.miner_id.clone(),
        hash_rate: state.hashrate_ghs,
        temp: state.chip_temp_c,
        vr_temp: state.vr_temp_c,
        power: state.power_w,
        fanspeed: state.fan_percent,
        fanrpm: state.fan_rpm,
        core_voltage: state.config.core_voltage_mv,
        frequency: state.config.frequency_mhz,
        error_percentage: state.error_percentage,
        shares_accepted: state.shares_accepted,
        shares_rejected: state.shares_rejected,
        pool_state: state.pool_state,
        uptime_seconds: state.uptime_seconds,
        voltage: model.input_voltage_v,
        targettemp: state.config.targettemp_c,
        autofanspeed: state.config.autofanspeed,
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::PresetCatalog;

    #[test]
    fn snapshot_carries_input_voltage_from_preset() {
        let catalog = PresetCatalog::bundled();
        let model = catalog.model("bm1370_4chip").unwrap();
        let state = MinerState::new(
            "m_001".to_string(),
            model.model_id.clone(),
            "healthy".to_string(),
            0.0,
            model.ambient_c_default,
            model.core_voltage_mv,
            model.frequency_mhz,
            7,
            2.0,
        );
        let snap = snapshot(&state, model, 1_700_000_000.0);
        assert_eq!(snap.voltage, model.input_voltage_v);
        assert_eq!(snap.miner_id, "m_001");
        assert_eq!(snap.timestamp, 1_700_000_000.0);
    }

    #[test]
    fn wire_field_names_match_the_external_contract() {
        let catalog = PresetCatalog::bundled();
        let model = catalog.model("bm1370_4chip").unwrap();
        let state = MinerState::new(
            "m_002".to_string(),
            model.model_id.clone(),
            "healthy".to_string(),
            0.0,
            model.ambient_c_default,
            model.core_voltage_mv,
            model.frequency_mhz,
            7,
            2.0,
        );
        let snap = snapshot(&state, model, 1_700_000_000.0);
        let value = serde_json::to_value(&snap).expect("telemetry snapshot serializes");
        let object = value.as_object().expect("snapshot serializes as a JSON object");
        for field in [
            "miner_id",
            "hashRate",
            "temp",
            "vrTemp",
            "power",
            "fanspeed",
            "fanrpm",
            "coreVoltage",
            "frequency",
            "errorPercentage",
            "sharesAccepted",
            "sharesRejected",
            "poolState",
            "uptimeSeconds",
            "voltage",
            "targettemp",
            "autofanspeed",
            "timestamp",
        ] {
            assert!(object.contains_key(field), "missing wire field {field}");
        }
    }
}
