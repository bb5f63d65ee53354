//! Injectable time source.
//!
//! The engine itself never reads wall-clock time; only the tick worker (or a
//! test driving `FleetRuntime::tick_all` directly) asks a `Clock` what time it
//! is. This is the seam that lets tests feed an arbitrary `dt` sequence
//! without real sleeps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A monotonic source of "now", expressed as seconds since an arbitrary epoch.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> f64;
}

/// Wall-clock time, seconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// A clock tests can advance by hand, for deterministic dt sequences.
///
/// Stored as bit-patterns of f64 in an AtomicU64 so `advance`/`now_secs` need
/// no locking.
#[derive(Clone)]
pub struct VirtualClock {
    bits: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new(start_secs: f64) -> Self {
        Self { bits: Arc::new(AtomicU64::new(start_secs.to_bits())) }
    }

    pub fn advance(&self, dt_secs: f64) {
        let current = f64::from_bits(self.bits.load(Ordering::SeqCst));
        self.bits.store((current + dt_secs).to_bits(), Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now_secs(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances_deterministically() {
        let clock = VirtualClock::new(100.0);
        assert_eq!(clock.now_secs(), 100.0);
        clock.advance(1.5);
        assert_eq!(clock.now_secs(), 101.5);
        clock.advance(0.5);
        assert_eq!(clock.now_secs(), 102.0);
    }

    #[test]
    fn system_clock_is_positive_and_recent() {
        let clock = SystemClock;
        let now = clock.now_secs();
        assert!(now > 1_700_000_000.0);
    }
}
