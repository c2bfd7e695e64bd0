use std::time::Duration;

use envconfig::Envconfig;

use crate::sweeper::MIN_SWEEP_INTERVAL;

#[derive(Envconfig, Clone, Debug)]
pub struct RegistryConfig {
    // How long a creation may stay in flight before other callers stop deferring to it
    #[envconfig(from = "REALTIME_PENDING_GRACE_PERIOD_MS", default = "5000")]
    pub pending_grace_period_ms: u64,

    #[envconfig(from = "REALTIME_PENDING_SWEEP_INTERVAL_MS", default = "1000")]
    pub pending_sweep_interval_ms: u64,
}

impl RegistryConfig {
    pub fn pending_grace_period(&self) -> Duration {
        Duration::from_millis(self.pending_grace_period_ms)
    }

    /// Never shorter than `MIN_SWEEP_INTERVAL`, so `0` can't stop the sweeper.
    pub fn pending_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.pending_sweep_interval_ms).max(MIN_SWEEP_INTERVAL)
    }

    pub fn default_test_config() -> Self {
        Self {
            pending_grace_period_ms: 5000,
            pending_sweep_interval_ms: 1000,
        }
    }
}
