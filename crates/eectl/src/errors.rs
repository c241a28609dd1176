use thiserror::Error;

use crate::messages::PayloadId;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine no longer knows the payload id we asked for, engine API
    /// error code -38001.
    #[error("unknown payload ID {0}")]
    UnknownPayloadId(PayloadId),

    /// A forkchoice update with attributes came back without a payload id.
    #[error("missing payload ID in forkchoice response")]
    MissingPayloadId,

    /// The response envelope carried neither a recognized status nor an
    /// error object.
    #[error("unknown payload status from engine")]
    UnknownPayloadStatus,

    #[error("engine rpc {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}
