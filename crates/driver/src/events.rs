//! Execution-layer event delivery.
//!
//! Processors register at driver construction and receive, at commit time,
//! every log their filter claims.  Dispatch scans the registered list in
//! order, so registration order is precedence.

use std::sync::Arc;

use tenon_primitives::buf::{Buf20, Buf32};

/// A log emitted by the execution layer, as delivered to event processors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EvmLog {
    pub address: Buf20,
    pub topics: Vec<Buf32>,
    pub data: Vec<u8>,
}

/// The contract addresses and event signatures a processor subscribes to.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    pub addresses: Vec<Buf20>,
    pub topics: Vec<Buf32>,
}

impl EventFilter {
    /// Whether `log` falls under this filter.  The signature topic is the
    /// leading one; an empty topic list matches any event from a subscribed
    /// address.
    pub fn matches(&self, log: &EvmLog) -> bool {
        if !self.addresses.contains(&log.address) {
            return false;
        }
        if self.topics.is_empty() {
            return true;
        }
        log.topics.first().is_some_and(|t| self.topics.contains(t))
    }
}

/// Consumer of execution-layer events inside the commit flow.
pub trait EvmEventProcessor: Send + Sync {
    /// Registry name, unique across all registered processors.
    fn name(&self) -> &'static str;

    /// The logs this processor wants delivered.
    fn filter(&self) -> EventFilter;

    /// Handles one log from a committed block.
    fn deliver(&self, block_hash: &Buf32, log: &EvmLog) -> anyhow::Result<()>;
}

/// Finds the first registered processor whose filter claims `log`.
pub(crate) fn route<'p>(
    procs: &'p [Arc<dyn EvmEventProcessor>],
    log: &EvmLog,
) -> Option<&'p dyn EvmEventProcessor> {
    procs
        .iter()
        .find(|p| p.filter().matches(log))
        .map(|p| p.as_ref())
}
