//! Immutable parameter bundles consumed by the simulation engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A hardware archetype. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPreset {
    pub model_id: String,
    pub display_name: String,
    pub asic_count: u32,
    pub input_voltage_v: u8,
    pub frequency_mhz: u32,
    pub core_voltage_mv: u32,
    pub hashrate_per_chip_ghs_at_nominal: f64,
    pub power_w_at_nominal: f64,
    pub thermal_mass_j_per_c: f64,
    pub thermal_resistance_c_per_w: f64,
    pub vr_offset_c: f64,
    pub fan_max_rpm: u32,
    pub ambient_c_default: f64,
    pub freq_min_mhz: u32,
    pub freq_max_mhz: u32,
    pub core_voltage_min_mv: u32,
    pub core_voltage_max_mv: u32,
    /// Exponent of the sub-linear voltage term in `f(frequency, voltage)`.
    pub voltage_exponent: f64,
}

/// A public, read-only view of a [`ModelPreset`] suitable for `listModels()`.
/// Identical in content today; kept as a separate type per the design notes
/// so the catalog's internal fields can diverge from the wire view later
/// without touching callers.
pub type ModelPresetView = ModelPreset;

/// A behavioral overlay layered on top of a model preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPreset {
    pub scenario_id: String,
    pub ambient_override_c: Option<f64>,
    /// Multiplies the baseline reject rate; > 1.0 means more rejects.
    pub reject_bias: f64,
    /// Probability per second of a mining->reconnecting transition.
    pub disconnect_rate_per_s: f64,
    /// Mean time to recovery for reconnecting->mining, seconds.
    pub mttr_s: f64,
    /// Floor applied to the EWMA error percentage.
    pub error_floor_pct: f64,
    /// Standard deviation of the multiplicative hashrate jitter.
    pub hashrate_jitter_sigma: f64,
    /// Standard deviation of additive thermal noise, degrees C.
    pub thermal_noise_sigma: f64,
    /// connecting -> mining delay range, seconds.
    pub connect_delay_min_s: f64,
    pub connect_delay_max_s: f64,
    /// Restart duration used by `FleetRuntime::restart`.
    pub restart_duration_s: f64,
}

/// Owns the bundled, compiled-in model and scenario presets and resolves ids.
///
/// Unlike the teacher's `plugin.rs` (which loads third-party JSON plugins
/// from disk and validates trust before use), these presets are authored by
/// this crate and require no trust/validation step — they are simply
/// constructed once and shared via `Arc`.
#[derive(Clone)]
pub struct PresetCatalog {
    models: Arc<HashMap<String, ModelPreset>>,
    scenarios: Arc<HashMap<String, ScenarioPreset>>,
}

impl PresetCatalog {
    pub fn bundled() -> Self {
        let models = bundled_models().into_iter().map(|m| (m.model_id.clone(), m)).collect();
        let scenarios =
            bundled_scenarios().into_iter().map(|s| (s.scenario_id.clone(), s)).collect();
        Self { models: Arc::new(models), scenarios: Arc::new(scenarios) }
    }

    pub fn model(&self, model_id: &str) -> Option<&ModelPreset> {
        self.models.get(model_id)
    }

    pub fn scenario(&self, scenario_id: &str) -> Option<&ScenarioPreset> {
        self.scenarios.get(scenario_id)
    }

    pub fn list_models(&self) -> Vec<ModelPresetView> {
        let mut list: Vec<_> = self.models.values().cloned().collect();
        list.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        list
    }

    pub fn list_scenario_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.scenarios.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::bundled()
    }
}

fn bundled_models() -> Vec<ModelPreset> {
    vec![
        ModelPreset {
            model_id: "usb_compact_8chip".to_string(),
            display_name: "Compact USB 8-chip".to_string(),
            asic_count: 8,
            input_voltage_v: 5,
            frequency_mhz: 500,
            core_voltage_mv: 1100,
            hashrate_per_chip_ghs_at_nominal: 15.0,
            power_w_at_nominal: 12.0,
            thermal_mass_j_per_c: 180.0,
            thermal_resistance_c_per_w: 2.4,
            vr_offset_c: 3.0,
            fan_max_rpm: 6000,
            ambient_c_default: 25.0,
            freq_min_mhz: 350,
            freq_max_mhz: 650,
            core_voltage_min_mv: 950,
            core_voltage_max_mv: 1250,
            voltage_exponent: 0.4,
        },
        ModelPreset {
            model_id: "bm1370_4chip".to_string(),
            display_name: "BM1370-class 4-chip Hydro".to_string(),
            asic_count: 4,
            input_voltage_v: 12,
            frequency_mhz: 650,
            core_voltage_mv: 1150,
            hashrate_per_chip_ghs_at_nominal: 3200.0,
            power_w_at_nominal: 1200.0,
            thermal_mass_j_per_c: 2600.0,
            thermal_resistance_c_per_w: 0.045,
            vr_offset_c: 6.0,
            fan_max_rpm: 9000,
            ambient_c_default: 25.0,
            freq_min_mhz: 400,
            freq_max_mhz: 800,
            core_voltage_min_mv: 1000,
            core_voltage_max_mv: 1300,
            voltage_exponent: 0.4,
        },
        ModelPreset {
            model_id: "rack_144chip".to_string(),
            display_name: "Rack-scale 144-chip Unit".to_string(),
            asic_count: 144,
            input_voltage_v: 12,
            frequency_mhz: 600,
            core_voltage_mv: 1120,
            hashrate_per_chip_ghs_at_nominal: 120.0,
            power_w_at_nominal: 3250.0,
            thermal_mass_j_per_c: 9000.0,
            thermal_resistance_c_per_w: 0.012,
            vr_offset_c: 8.0,
            fan_max_rpm: 11000,
            ambient_c_default: 28.0,
            freq_min_mhz: 400,
            freq_max_mhz: 750,
            core_voltage_min_mv: 1000,
            core_voltage_max_mv: 1280,
            voltage_exponent: 0.45,
        },
    ]
}

fn bundled_scenarios() -> Vec<ScenarioPreset> {
    vec![
        ScenarioPreset {
            scenario_id: "healthy".to_string(),
            ambient_override_c: None,
            reject_bias: 0.02,
            disconnect_rate_per_s: 0.0002,
            mttr_s: 5.0,
            error_floor_pct: 0.05,
            hashrate_jitter_sigma: 0.015,
            thermal_noise_sigma: 0.05,
            connect_delay_min_s: 2.0,
            connect_delay_max_s: 5.0,
            restart_duration_s: 5.0,
        },
        ScenarioPreset {
            scenario_id: "hot_ambient".to_string(),
            ambient_override_c: Some(38.0),
            reject_bias: 0.04,
            disconnect_rate_per_s: 0.0004,
            mttr_s: 6.0,
            error_floor_pct: 0.1,
            hashrate_jitter_sigma: 0.02,
            thermal_noise_sigma: 0.08,
            connect_delay_min_s: 2.0,
            connect_delay_max_s: 5.0,
            restart_duration_s: 5.0,
        },
        ScenarioPreset {
            scenario_id: "flaky_pool".to_string(),
            ambient_override_c: None,
            reject_bias: 0.06,
            disconnect_rate_per_s: 0.004,
            mttr_s: 8.0,
            error_floor_pct: 0.2,
            hashrate_jitter_sigma: 0.02,
            thermal_noise_sigma: 0.05,
            connect_delay_min_s: 2.0,
            connect_delay_max_s: 5.0,
            restart_duration_s: 5.0,
        },
        ScenarioPreset {
            scenario_id: "degraded".to_string(),
            ambient_override_c: Some(32.0),
            reject_bias: 0.15,
            disconnect_rate_per_s: 0.0015,
            mttr_s: 10.0,
            error_floor_pct: 1.5,
            hashrate_jitter_sigma: 0.05,
            thermal_noise_sigma: 0.12,
            connect_delay_min_s: 3.0,
            connect_delay_max_s: 7.0,
            restart_duration_s: 8.0,
        },
    ]
}
