//! Shared infrastructure for driver services: the tracing bootstrap and the
//! process-wide metrics registry.

pub mod logging;
pub mod metrics;
