use std::sync::Arc;

use rockbound::{OptimisticTransactionDB as DB, SchemaDBOperationsExt, TransactionRetry};
use tenon_common::metrics::WITHDRAWALS_CREATED_TOTAL;
use tenon_db::{
    errors::DbError,
    traits::{ExecStateProvider, ExecStateStore},
    DbResult,
};
use tenon_primitives::buf::Buf20;
use tenon_state::{ExecutionHead, WithdrawalEntry};
use tracing::*;

use super::schemas::{ExecutionHeadSchema, WithdrawalAddrIndexSchema, WithdrawalSchema};
use crate::{sequence::get_next_id, DbOpsConfig};

/// Fixed key under which the singleton [`ExecutionHead`] row lives.
const EXECUTION_HEAD_ID: u64 = 1;

pub struct ExecStateDb {
    db: Arc<DB>,
    ops: DbOpsConfig,
}

impl ExecStateDb {
    /// Wraps an existing database handle.
    ///
    /// Assumes it was opened with column families as defined in `STORE_COLUMN_FAMILIES`.
    pub fn new(db: Arc<DB>, ops: DbOpsConfig) -> Self {
        Self { db, ops }
    }
}

impl ExecStateStore for ExecStateDb {
    fn insert_genesis_head(&self, block_hash: &[u8]) -> DbResult<()> {
        let hash: [u8; 32] = block_hash
            .try_into()
            .map_err(|_| DbError::InvalidGenesisHash("must be 32 bytes"))?;
        if hash == [0u8; 32] {
            return Err(DbError::InvalidGenesisHash("must be nonzero"));
        }
        let head = ExecutionHead::genesis(hash.into());

        self.db
            .with_optimistic_txn(
                TransactionRetry::Count(self.ops.retry_count),
                |txn| -> Result<(), DbError> {
                    if txn
                        .get::<ExecutionHeadSchema>(&EXECUTION_HEAD_ID)?
                        .is_some()
                    {
                        return Err(DbError::HeadAlreadyExists); // should never happen
                    }
                    txn.put::<ExecutionHeadSchema>(&EXECUTION_HEAD_ID, &head)?;
                    Ok(())
                },
            )
            .map_err(|e| DbError::TransactionError(e.to_string()))?;

        info!(block_hash = ?head.block_hash(), "initialized execution head");
        Ok(())
    }

    fn update_head(&self, head: ExecutionHead) -> DbResult<()> {
        self.db
            .with_optimistic_txn(
                TransactionRetry::Count(self.ops.retry_count),
                |txn| -> Result<(), DbError> {
                    let cur = txn
                        .get_for_update::<ExecutionHeadSchema>(&EXECUTION_HEAD_ID)?
                        .ok_or(DbError::NotBootstrapped)?;
                    if head.block_height() != cur.block_height() + 1 {
                        // should never happen
                        return Err(DbError::NonMonotonicHeadUpdate(
                            cur.block_height(),
                            head.block_height(),
                        ));
                    }
                    txn.put::<ExecutionHeadSchema>(&EXECUTION_HEAD_ID, &head)?;
                    Ok(())
                },
            )
            .map_err(|e| DbError::TransactionError(e.to_string()))
    }

    fn insert_withdrawal(
        &self,
        address: Buf20,
        amount_gwei: u64,
        created_height: u64,
    ) -> DbResult<u64> {
        if amount_gwei == 0 {
            return Err(DbError::ZeroAmountWithdrawal);
        }

        let id = self
            .db
            .with_optimistic_txn(
                TransactionRetry::Count(self.ops.retry_count),
                |txn| -> Result<u64, DbError> {
                    let id = get_next_id::<WithdrawalSchema, DB>(txn)?;
                    let entry = WithdrawalEntry::new(id, address, created_height, amount_gwei);
                    txn.put::<WithdrawalSchema>(&id, &entry)?;

                    let mut ids = txn
                        .get_for_update::<WithdrawalAddrIndexSchema>(&address)?
                        .unwrap_or_default();
                    ids.push(id);
                    txn.put::<WithdrawalAddrIndexSchema>(&address, &ids)?;

                    Ok(id)
                },
            )
            .map_err(|e| DbError::TransactionError(e.to_string()))?;

        WITHDRAWALS_CREATED_TOTAL.inc();
        Ok(id)
    }

    fn remove_withdrawals(&self, ids: &[u64]) -> DbResult<()> {
        self.db
            .with_optimistic_txn(
                TransactionRetry::Count(self.ops.retry_count),
                |txn| -> Result<(), DbError> {
                    for id in ids {
                        let entry = txn
                            .get_for_update::<WithdrawalSchema>(id)?
                            .ok_or(DbError::MissingWithdrawal(*id))?; // should never happen
                        txn.delete::<WithdrawalSchema>(id)?;

                        let address = entry.address();
                        let mut index = txn
                            .get_for_update::<WithdrawalAddrIndexSchema>(&address)?
                            .unwrap_or_default();
                        index.retain(|i| i != id);
                        if index.is_empty() {
                            txn.delete::<WithdrawalAddrIndexSchema>(&address)?;
                        } else {
                            txn.put::<WithdrawalAddrIndexSchema>(&address, &index)?;
                        }
                    }
                    Ok(())
                },
            )
            .map_err(|e| DbError::TransactionError(e.to_string()))
    }
}

impl ExecStateProvider for ExecStateDb {
    fn get_head(&self) -> DbResult<ExecutionHead> {
        self.db
            .get::<ExecutionHeadSchema>(&EXECUTION_HEAD_ID)?
            .ok_or(DbError::NotBootstrapped)
    }

    fn list_eligible_withdrawals(&self, cap: u64) -> DbResult<Vec<WithdrawalEntry>> {
        let mut out = Vec::new();
        // Keys are big-endian, so iteration order is ascending id order.
        for res in self.db.iter::<WithdrawalSchema>()? {
            if out.len() as u64 >= cap {
                break;
            }
            let (_, entry) = res?.into_tuple();
            out.push(entry);
        }
        Ok(out)
    }

    fn list_withdrawals_by_address(&self, address: Buf20) -> DbResult<Vec<WithdrawalEntry>> {
        let ids = self
            .db
            .get::<WithdrawalAddrIndexSchema>(&address)?
            .unwrap_or_default();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = self
                .db
                .get::<WithdrawalSchema>(&id)?
                .ok_or(DbError::MissingWithdrawal(id))?; // should never happen
            out.push(entry);
        }
        Ok(out)
    }
}
