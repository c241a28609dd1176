use std::time::Duration;

use serde::Deserialize;

/// Tunables for the engine driver.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Delay between triggering a synchronous payload build and fetching the
    /// result, giving the engine time to pull transactions from its pool.
    pub build_delay_ms: u64,

    /// Whether to speculatively build payloads ahead of our proposer turn.
    pub build_optimistic: bool,

    /// Most withdrawals a single payload may carry.
    pub max_withdrawals_per_block: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            build_delay_ms: 600,
            build_optimistic: true,
            max_withdrawals_per_block: 32,
        }
    }
}

impl DriverConfig {
    pub fn build_delay(&self) -> Duration {
        Duration::from_millis(self.build_delay_ms)
    }
}
