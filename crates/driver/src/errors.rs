use tenon_db::errors::DbError;
use tenon_eectl::errors::EngineError;
use tenon_eectl::messages::BlockStatus;
use tenon_primitives::buf::{Buf20, Buf32};
use thiserror::Error;

pub type DriverResult<T> = Result<T, DriverError>;

/// Why a proposed payload was rejected.  Mismatched invariants carry both
/// sides so a vote against a proposal is explainable from the log line.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The proposal populated both the typed and the legacy encoding.
    #[error("only one payload type allowed")]
    MultiplePayloads,

    /// The proposal populated neither encoding.
    #[error("no payload provided")]
    MissingPayload,

    #[error("decoding payload: {0}")]
    Decode(String),

    /// The payload's withdrawal list is not exactly the eligible set.
    #[error("withdrawals mismatch with eligible withdrawals")]
    WithdrawalsMismatch,

    /// Witness-carrying payloads never cross the proposal boundary.
    #[error("witness not allowed in payload")]
    UnexpectedWitness,

    /// The fee recipient capability turned the payload down, reason verbatim.
    #[error("fee recipient: {0}")]
    FeeRecipient(anyhow::Error),

    #[error("invalid payload number: expected {expected}, got {got}")]
    InvalidPayloadNumber { expected: u64, got: u64 },

    #[error("invalid parent hash: expected {expected:?}, got {got:?}")]
    InvalidParentHash { expected: Buf32, got: Buf32 },

    #[error("invalid timestamp: must be in [{min}, {max}], got {got}")]
    InvalidTimestamp { min: u64, max: u64, got: u64 },

    #[error("invalid prev randao: expected {expected:?}, got {got:?}")]
    InvalidRandao { expected: Buf32, got: Buf32 },

    #[error("db: {0}")]
    Db(#[from] DbError),
}

/// Driver failures outside payload validation proper.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("engine: {0}")]
    Engine(#[from] EngineError),

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("payload rejected: {0}")]
    Payload(#[from] PayloadError),

    #[error("duplicate event processor name {0}")]
    DuplicateEventProc(String),

    /// A committed log no registered processor claims, likely a filter and
    /// deployment drift.
    #[error("no event processor claims log from {0:?}")]
    UnroutedEvent(Buf20),

    #[error("event processor {name}: {err}")]
    EventProc {
        name: &'static str,
        err: anyhow::Error,
    },

    /// The engine cannot judge or build payloads until it finishes syncing.
    #[error("engine is syncing")]
    EngineSyncing,

    /// The engine rejected a payload consensus already committed.
    #[error("engine rejected committed payload: {0}")]
    RejectedPayload(String),

    #[error("unexpected engine status {0:?}")]
    UnexpectedStatus(BlockStatus),

    /// The engine built a payload for a different height than requested.
    #[error("built payload height mismatch: expected {expected}, got {got}")]
    BuiltHeightMismatch { expected: u64, got: u64 },

    #[error("{0}")]
    Other(String),
}
