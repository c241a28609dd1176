use std::fmt;

use tenon_primitives::buf::{Buf20, Buf32};
use tenon_state::{ElPayload, ElWithdrawal};

/// Identifier for a payload build job started by a forkchoice update with
/// attributes.  Opaque to us, the engine assigns it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PayloadId([u8; 8]);

impl PayloadId {
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// The engine's verdict on a payload we submitted or pointed forkchoice at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BlockStatus {
    /// The payload is valid.
    Valid,

    /// The payload is invalid, with the engine's own validation error when it
    /// gave one.
    Invalid { validation_error: Option<String> },

    /// The engine is still syncing previous blocks and can't judge this
    /// payload yet.
    Syncing,

    /// The payload was stashed as a side chain candidate without full
    /// validation.
    Accepted,
}

/// Forkchoice state we push to the engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ForkchoiceTarget {
    head: Buf32,
    safe: Buf32,
    finalized: Buf32,
}

impl ForkchoiceTarget {
    pub fn new(head: Buf32, safe: Buf32, finalized: Buf32) -> Self {
        Self {
            head,
            safe,
            finalized,
        }
    }

    /// Target with head, safe and finalized all set to the same block.  Every
    /// committed block is final, there is no fork choice to make.
    pub fn all(id: Buf32) -> Self {
        Self::new(id, id, id)
    }

    pub fn head(&self) -> Buf32 {
        self.head
    }

    pub fn safe(&self) -> Buf32 {
        self.safe
    }

    pub fn finalized(&self) -> Buf32 {
        self.finalized
    }
}

/// Environment state from the CL that we pass into the EL for the payload
/// we're asking it to build.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayloadEnv {
    /// Timestamp the new block should carry.
    timestamp: u64,

    /// Randomness value passed through to the EL verbatim.
    prev_randao: Buf32,

    /// Address that receives the block's fees.
    fee_recipient: Buf20,

    /// Withdrawals to force into the block.
    withdrawals: Vec<ElWithdrawal>,

    /// Beacon root field required by the V3+ attributes, zero for us.
    parent_beacon_block_root: Buf32,
}

impl PayloadEnv {
    pub fn new(
        timestamp: u64,
        prev_randao: Buf32,
        fee_recipient: Buf20,
        withdrawals: Vec<ElWithdrawal>,
        parent_beacon_block_root: Buf32,
    ) -> Self {
        Self {
            timestamp,
            prev_randao,
            fee_recipient,
            withdrawals,
            parent_beacon_block_root,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn prev_randao(&self) -> Buf32 {
        self.prev_randao
    }

    pub fn fee_recipient(&self) -> Buf20 {
        self.fee_recipient
    }

    pub fn withdrawals(&self) -> &[ElWithdrawal] {
        &self.withdrawals
    }

    pub fn parent_beacon_block_root(&self) -> Buf32 {
        self.parent_beacon_block_root
    }
}

/// Outcome of a forkchoice update.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForkchoiceResp {
    status: BlockStatus,
    payload_id: Option<PayloadId>,
}

impl ForkchoiceResp {
    pub fn new(status: BlockStatus, payload_id: Option<PayloadId>) -> Self {
        Self { status, payload_id }
    }

    pub fn status(&self) -> &BlockStatus {
        &self.status
    }

    pub fn payload_id(&self) -> Option<PayloadId> {
        self.payload_id
    }
}

/// A payload the engine finished building for us.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuiltPayload {
    payload: ElPayload,
}

impl BuiltPayload {
    pub fn new(payload: ElPayload) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &ElPayload {
        &self.payload
    }

    pub fn into_payload(self) -> ElPayload {
        self.payload
    }
}
