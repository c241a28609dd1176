use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use tenon_primitives::buf::Buf32;

/// The last execution block accepted by consensus.
///
/// Exactly one instance is ever persisted. `block_height` advances by exactly
/// one per committed payload and `block_hash` is always the committed
/// payload's own hash, never derived locally.
#[derive(Copy, Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Arbitrary)]
pub struct ExecutionHead {
    created_height: u64,
    block_height: u64,
    block_hash: Buf32,
    block_time: u64,
}

impl ExecutionHead {
    pub fn new(created_height: u64, block_height: u64, block_hash: Buf32, block_time: u64) -> Self {
        Self {
            created_height,
            block_height,
            block_hash,
            block_time,
        }
    }

    /// The head written at genesis: execution height 0, block time 0.
    pub fn genesis(block_hash: Buf32) -> Self {
        Self::new(0, 0, block_hash, 0)
    }

    /// Consensus height at which this record was written.
    pub fn created_height(&self) -> u64 {
        self.created_height
    }

    /// Execution block height.
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    /// Execution block hash.
    pub fn block_hash(&self) -> Buf32 {
        self.block_hash
    }

    /// Execution block timestamp, unix seconds.
    pub fn block_time(&self) -> u64 {
        self.block_time
    }
}
