//! Console demo: boots a small fleet, ticks it for a while, prints telemetry.
//!
//! In the spirit of the teacher's `apps/desktop` entry point, minus the UI
//! and HTTP layer (both out of scope here) — this just proves the engine and
//! fleet runtime work end to end.

use asicfleet_engine::{Clock, FleetConfig, FleetRuntime, PresetCatalog, SystemClock, TickWorker};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = FleetConfig::default();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fleet = Arc::new(FleetRuntime::new(PresetCatalog::bundled(), clock.clone(), config.max_miners));

    let usb = fleet.create("usb_compact_8chip", "healthy").await.expect("create usb miner");
    let hydro = fleet.create("bm1370_4chip", "hot_ambient").await.expect("create hydro miner");
    let rack = fleet.create("rack_144chip", "flaky_pool").await.expect("create rack miner");
    info!(usb, hydro, rack, "demo fleet created");

    let worker = TickWorker::spawn(fleet.clone(), clock.clone(), config.tick_cadence());

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        for miner_id in [&usb, &hydro, &rack] {
            match fleet.snapshot(miner_id).await {
                Ok(snap) => info!(
                    miner_id = %snap.miner_id,
                    pool_state = ?snap.pool_state,
                    hash_rate = snap.hash_rate,
                    temp = snap.temp,
                    fan = snap.fanspeed,
                    "telemetry"
                ),
                Err(err) => info!(miner_id, error = %err, "snapshot failed"),
            }
        }
    }

    worker.shutdown().await;
}
