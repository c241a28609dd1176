//! Prometheus metrics for the execution driver.
//!
//! Everything lands in one [`REGISTRY`] that embedders expose through
//! whatever endpoint serves their scrapes. Engine RPC timing is recorded
//! through [`TimingGuard`].

use std::time::Instant;

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramOpts,
    HistogramVec, IntCounter, IntCounterVec, Registry,
};

lazy_static! {
    /// Registry holding every metric below.
    pub static ref REGISTRY: Registry = Registry::new();

    /// Duration of execution engine RPC calls, labelled by method.
    pub static ref ENGINE_RPC_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        HistogramOpts::new(
            "tenon_engine_rpc_duration_seconds",
            "Time spent on execution engine RPC calls"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["method"]
    )
    .unwrap();

    /// Engine RPC calls that failed outright, labelled by method.
    pub static ref ENGINE_RPC_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tenon_engine_rpc_errors_total",
        "Total number of failed execution engine RPC calls",
        &["method"]
    )
    .unwrap();

    /// Withdrawals accepted into the pending queue.
    pub static ref WITHDRAWALS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "tenon_withdrawals_created_total",
        "Total number of withdrawals inserted into the queue"
    )
    .unwrap();

    /// Optimistic build outcomes observed at proposal time.
    /// Labels: outcome=[hit|miss]
    pub static ref OPTIMISTIC_BUILDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "tenon_optimistic_builds_total",
        "Outcomes of optimistic payload builds at proposal time",
        &["outcome"]
    )
    .unwrap();
}

/// Registers every metric with [`REGISTRY`]. Call once at startup.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(ENGINE_RPC_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(ENGINE_RPC_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WITHDRAWALS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OPTIMISTIC_BUILDS_TOTAL.clone()))?;
    Ok(())
}

/// Times one engine RPC call, recording the duration on drop.
pub struct TimingGuard {
    method: &'static str,
    started: Instant,
}

impl TimingGuard {
    pub fn for_method(method: &'static str) -> Self {
        Self {
            method,
            started: Instant::now(),
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        ENGINE_RPC_DURATION_SECONDS
            .with_label_values(&[self.method])
            .observe(self.started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_all_metrics() {
        register_metrics().expect("register metrics");
        assert!(!REGISTRY.gather().is_empty());
    }
}
