use async_trait::async_trait;
#[cfg(feature = "mocks")]
use mockall::automock;
use tenon_primitives::buf::Buf32;
use tenon_state::ElPayload;

use crate::errors::EngineResult;
use crate::messages::{BlockStatus, BuiltPayload, ForkchoiceResp, ForkchoiceTarget, PayloadEnv, PayloadId};

/// Interface to drive an execution engine.  Mirrors the three engine API
/// calls the driver needs, with engine responses already classified into
/// protocol verdicts.
#[cfg_attr(feature = "mocks", automock)]
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Submits a full payload for execution and import, returning the
    /// engine's verdict on it.
    async fn submit_payload(
        &self,
        payload: ElPayload,
        versioned_hashes: Vec<Buf32>,
        parent_beacon_block_root: Buf32,
        execution_requests: Vec<Vec<u8>>,
    ) -> EngineResult<BlockStatus>;

    /// Moves the engine's forkchoice to `target`.  With `attrs` set this also
    /// kicks off a payload build job, whose id comes back in the response.
    async fn update_forkchoice(
        &self,
        target: ForkchoiceTarget,
        attrs: Option<PayloadEnv>,
    ) -> EngineResult<ForkchoiceResp>;

    /// Fetches a payload the engine has been building.
    async fn get_payload(&self, payload_id: PayloadId) -> EngineResult<BuiltPayload>;
}
