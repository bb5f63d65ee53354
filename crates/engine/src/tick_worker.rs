//! Background task driving [`FleetRuntime::tick_all`] at a fixed cadence.
//!
//! Grounded on the teacher's `FakeMinerAdapter::start`: a `tokio::spawn` loop
//! selecting between a shutdown channel and an `interval.tick()`, generalized
//! from "one adapter polling one fake process" to "one worker ticking every
//! miner in the fleet".

use crate::clock::Clock;
use crate::fleet::FleetRuntime;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Owns the interval loop and shutdown channel for a running fleet.
pub struct TickWorker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TickWorker {
    /// Spawns the tick loop at the given cadence. The loop calls
    /// `fleet.tick_all(clock.now_secs())` on every tick until shutdown is
    /// requested, then finishes the in-flight tick and exits.
    pub fn spawn(fleet: Arc<FleetRuntime>, clock: Arc<dyn Clock>, cadence: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(cadence);
            info!(cadence_ms = cadence.as_millis() as u64, "tick worker started");
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        fleet.tick_all(clock.now_secs()).await;
                        debug!("tick completed");
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("tick worker stopped");
        });
        Self { shutdown_tx, handle }
    }

    /// Signals shutdown and waits for the current tick to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
