use rockbound::{rocksdb, CodecError};
use thiserror::Error;

/// Simple result type used across the database interface.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not yet bootstrapped")]
    NotBootstrapped,

    #[error("execution head already initialized")]
    HeadAlreadyExists,

    /// (have, got)
    #[error("non-monotonic head update (have {0}, got {1})")]
    NonMonotonicHeadUpdate(u64, u64),

    #[error("invalid genesis hash: {0}")]
    InvalidGenesisHash(&'static str),

    #[error("zero withdrawal amount")]
    ZeroAmountWithdrawal,

    #[error("missing withdrawal {0}")]
    MissingWithdrawal(u64),

    #[error("transaction: {0}")]
    TransactionError(String),

    #[error("rocksdb: {0}")]
    Rocksdb(#[from] rocksdb::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for DbError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<CodecError> for DbError {
    fn from(value: CodecError) -> Self {
        Self::Other(value.to_string())
    }
}
