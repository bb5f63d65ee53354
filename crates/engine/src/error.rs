use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single rejected field from a config patch, surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigViolation {
    pub field: String,
    pub reason: String,
}

impl ConfigViolation {
    pub fn out_of_range(field: &str) -> Self {
        Self { field: field.to_string(), reason: "out_of_range".to_string() }
    }

    pub fn invalid(field: &str, reason: &str) -> Self {
        Self { field: field.to_string(), reason: reason.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("unknown miner_id: {0}")]
    MinerNotFound(String),
    #[error("unknown model_id: {0}")]
    ModelNotFound(String),
    #[error("unknown scenario_id: {0}")]
    ScenarioNotFound(String),
    #[error("config patch rejected: {violations:?}")]
    InvalidConfig { violations: Vec<ConfigViolation> },
    #[error("fleet is at capacity ({max_miners} miners)")]
    FleetBusy { max_miners: usize },
}

pub type Result<T> = std::result::Result<T, FleetError>;
