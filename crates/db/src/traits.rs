//! Traits for the consensus-side execution state store.

#[cfg(feature = "mocks")]
use mockall::automock;
use tenon_primitives::buf::Buf20;
use tenon_state::{ExecutionHead, WithdrawalEntry};

use crate::DbResult;

/// Write interface for the execution head and the withdrawal queue.
///
/// Writes happen only inside the consensus round lifecycle: the genesis
/// insert at chain setup, the head update and withdrawal removal at commit,
/// and withdrawal inserts from event handling.
#[cfg_attr(feature = "mocks", automock)]
pub trait ExecStateStore {
    /// Writes the genesis execution head. The hash must be exactly 32
    /// nonzero bytes. Fails if a head row already exists, the head is a
    /// singleton.
    fn insert_genesis_head(&self, block_hash: &[u8]) -> DbResult<()>;

    /// Overwrites the execution head after a payload commits. Fails if the
    /// store was never bootstrapped or if the new block height is not
    /// exactly one above the stored one.
    fn update_head(&self, head: ExecutionHead) -> DbResult<()>;

    /// Appends a withdrawal to the queue, returning its assigned id. Fails
    /// on a zero amount.
    fn insert_withdrawal(
        &self,
        address: Buf20,
        amount_gwei: u64,
        created_height: u64,
    ) -> DbResult<u64>;

    /// Removes withdrawals by id after the payload carrying them commits.
    /// A missing id fails the whole batch, it may indicate double
    /// processing.
    fn remove_withdrawals(&self, ids: &[u64]) -> DbResult<()>;
}

/// Read interface for the execution head and the withdrawal queue.
///
/// Payload validation is expressed over this trait only, which keeps it free
/// of writes by construction.
#[cfg_attr(feature = "mocks", automock)]
pub trait ExecStateProvider {
    /// Returns the current execution head. Fails if the store was never
    /// bootstrapped.
    fn get_head(&self) -> DbResult<ExecutionHead>;

    /// Returns up to `cap` withdrawals in ascending id order, i.e. the set
    /// eligible for inclusion in the next payload.
    fn list_eligible_withdrawals(&self, cap: u64) -> DbResult<Vec<WithdrawalEntry>>;

    /// Returns all queued withdrawals for a recipient address, ascending by
    /// id.
    fn list_withdrawals_by_address(&self, address: Buf20) -> DbResult<Vec<WithdrawalEntry>>;
}
