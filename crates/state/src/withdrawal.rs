use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use tenon_primitives::buf::Buf20;

use crate::el_payload::ElWithdrawal;

/// A queued consensus-to-execution withdrawal.
///
/// `id` is store-assigned and strictly increasing, so ascending id order is
/// creation order. An entry stays eligible for inclusion until the payload
/// carrying it commits, at which point it is removed by id.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Arbitrary)]
pub struct WithdrawalEntry {
    id: u64,
    address: Buf20,
    created_height: u64,
    amount_gwei: u64,
}

impl WithdrawalEntry {
    pub fn new(id: u64, address: Buf20, created_height: u64, amount_gwei: u64) -> Self {
        Self {
            id,
            address,
            created_height,
            amount_gwei,
        }
    }

    /// Queue id, also the FIFO order key.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Recipient address on the execution side.
    pub fn address(&self) -> Buf20 {
        self.address
    }

    /// Consensus height at which the withdrawal was created.
    pub fn created_height(&self) -> u64 {
        self.created_height
    }

    /// Amount in gwei, always nonzero.
    pub fn amount_gwei(&self) -> u64 {
        self.amount_gwei
    }
}

impl From<&WithdrawalEntry> for ElWithdrawal {
    fn from(value: &WithdrawalEntry) -> Self {
        ElWithdrawal {
            index: value.id,
            validator_index: 0,
            address: value.address,
            amount_gwei: value.amount_gwei,
        }
    }
}
