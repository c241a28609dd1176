use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tenon_db::traits::{ExecStateProvider, ExecStateStore};
use tenon_eectl::engine::EngineApi;
use tenon_eectl::messages::PayloadId;
use tenon_primitives::buf::Buf32;

use crate::config::DriverConfig;
use crate::errors::{DriverError, DriverResult};
use crate::events::{self, EvmEventProcessor, EvmLog};
use crate::providers::{AddressProvider, ConsensusApi, FeeRecipientProvider};

/// Consensus round context handed in by the enclosing round lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConsensusRound {
    height: u64,
    timestamp: u64,
}

impl ConsensusRound {
    pub fn new(height: u64, timestamp: u64) -> Self {
        Self { height, timestamp }
    }

    /// Consensus chain height of this round.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Consensus timestamp of this round, unix seconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Handle to a payload build started in the engine ahead of our proposer
/// turn.  Overwritten by every new trigger, consumed by the propose path.
#[derive(Copy, Clone, Debug)]
pub struct OptimisticPayload {
    payload_id: PayloadId,
    height: u64,
    updated_at: Instant,
}

impl OptimisticPayload {
    pub(crate) fn new(payload_id: PayloadId, height: u64) -> Self {
        Self {
            payload_id,
            height,
            updated_at: Instant::now(),
        }
    }

    pub fn payload_id(&self) -> PayloadId {
        self.payload_id
    }

    /// Execution height the build targets.
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }
}

/// Drives the execution engine on behalf of the consensus round lifecycle.
///
/// The consensus side calls into it at three points of a round:
/// `trigger_build_optimistic` after a commit, `propose_payload` when it is
/// this node's turn to propose, and `apply_payload` when a proposal commits.
/// One instance lives for the process lifetime.
pub struct EngineDriver<E, D> {
    pub(crate) engine: Arc<E>,
    pub(crate) db: Arc<D>,
    pub(crate) addresses: Arc<dyn AddressProvider>,
    pub(crate) fee_recipients: Arc<dyn FeeRecipientProvider>,
    pub(crate) consensus: RwLock<Option<Arc<dyn ConsensusApi>>>,
    pub(crate) event_procs: Vec<Arc<dyn EvmEventProcessor>>,
    pub(crate) optimistic: Mutex<Option<OptimisticPayload>>,
    pub(crate) build_optimistic: AtomicBool,
    pub(crate) config: DriverConfig,
}

impl<E, D> EngineDriver<E, D>
where
    E: EngineApi,
    D: ExecStateStore + ExecStateProvider,
{
    /// Builds a driver over an engine client and a state store.  Fails if
    /// two event processors share a name.
    pub fn new(
        engine: Arc<E>,
        db: Arc<D>,
        addresses: Arc<dyn AddressProvider>,
        fee_recipients: Arc<dyn FeeRecipientProvider>,
        event_procs: Vec<Arc<dyn EvmEventProcessor>>,
        config: DriverConfig,
    ) -> DriverResult<Self> {
        let mut names = HashSet::new();
        for proc in &event_procs {
            if !names.insert(proc.name()) {
                return Err(DriverError::DuplicateEventProc(proc.name().to_string()));
            }
        }

        let build_optimistic = AtomicBool::new(config.build_optimistic);
        Ok(Self {
            engine,
            db,
            addresses,
            fee_recipients,
            consensus: RwLock::new(None),
            event_procs,
            optimistic: Mutex::new(None),
            build_optimistic,
            config,
        })
    }

    /// Registers the consensus API once it is reachable.  Until then the
    /// driver skips proposer prediction.
    pub fn set_consensus_api(&self, api: Arc<dyn ConsensusApi>) {
        *self.consensus.write() = Some(api);
    }

    /// Turns speculative building on or off at runtime.  Disabling also
    /// drops any held build handle, it would be stale after a rollback.
    pub fn set_build_optimistic(&self, enabled: bool) {
        self.build_optimistic.store(enabled, Ordering::Relaxed);
        if !enabled {
            *self.optimistic.lock() = None;
        }
    }

    /// The optimistic build handle currently held, if any.
    pub fn optimistic_payload(&self) -> Option<OptimisticPayload> {
        *self.optimistic.lock()
    }

    pub(crate) fn deliver_events(&self, block_hash: &Buf32, logs: &[EvmLog]) -> DriverResult<()> {
        for log in logs {
            let Some(proc) = events::route(&self.event_procs, log) else {
                return Err(DriverError::UnroutedEvent(log.address));
            };
            proc.deliver(block_hash, log)
                .map_err(|err| DriverError::EventProc {
                    name: proc.name(),
                    err,
                })?;
        }
        Ok(())
    }
}
