pub mod exec_state;

pub mod macros;
mod sequence;

#[cfg(feature = "test_utils")]
pub mod test_utils;

pub const ROCKSDB_NAME: &str = "tenon";

pub const STORE_COLUMN_FAMILIES: &[ColumnFamilyName] = &[
    SequenceSchema::COLUMN_FAMILY_NAME,
    ExecutionHeadSchema::COLUMN_FAMILY_NAME,
    WithdrawalSchema::COLUMN_FAMILY_NAME,
    WithdrawalAddrIndexSchema::COLUMN_FAMILY_NAME,
];

// Re-exports
pub use exec_state::db::ExecStateDb;
use rockbound::{schema::ColumnFamilyName, Schema};

use crate::{
    exec_state::schemas::{ExecutionHeadSchema, WithdrawalAddrIndexSchema, WithdrawalSchema},
    sequence::SequenceSchema,
};

/// Tuning knobs shared by all store instances.
#[derive(Clone, Copy, Debug)]
pub struct DbOpsConfig {
    /// How many times an optimistic transaction is retried before giving up.
    pub retry_count: u16,
}

impl DbOpsConfig {
    pub fn new(retry_count: u16) -> Self {
        Self { retry_count }
    }
}
