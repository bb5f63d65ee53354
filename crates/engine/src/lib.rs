//! Deterministic simulation engine and fleet runtime for virtual ASIC
//! bitcoin miners.
//!
//! This crate owns the hard part: per-miner physical/behavioral simulation
//! (`engine`, `state`, `preset`, `prng`) and the concurrency-safe runtime
//! that advances many of them on a shared clock (`fleet`, `tick_worker`).
//! The HTTP layer, UI, and persistence are deliberately out of scope here;
//! see SPEC_FULL.md §1.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod fleet_config;
pub mod preset;
pub mod prng;
pub mod state;
pub mod telemetry;
pub mod tick_worker;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use error::{ConfigViolation, FleetError, Result};
pub use fleet::{FleetRuntime, MinerSummary, PatchOutcome};
pub use fleet_config::FleetConfig;
pub use preset::{ModelPreset, ModelPresetView, PresetCatalog, ScenarioPreset};
pub use prng::Prng;
pub use state::{ConfigPatch, MinerConfig, MinerState, PoolState};
pub use telemetry::TelemetrySnapshot;
pub use tick_worker::TickWorker;
