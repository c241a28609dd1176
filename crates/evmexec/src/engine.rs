use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rpc_types_engine::{
    ExecutionPayloadV3, ForkchoiceState, PayloadAttributes, PayloadId as RpcPayloadId,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tenon_common::metrics::{TimingGuard, ENGINE_RPC_ERRORS_TOTAL};
use tenon_eectl::engine::EngineApi;
use tenon_eectl::errors::{EngineError, EngineResult};
use tenon_eectl::messages::{
    BlockStatus, BuiltPayload, ForkchoiceResp, ForkchoiceTarget, PayloadEnv, PayloadId,
};
use tenon_primitives::buf::Buf32;
use tenon_state::ElPayload;
use tracing::*;

use crate::http_client::{EngineTransport, JsonRpcError, JsonRpcRequest, JsonRpcResponse};

pub const ENGINE_NEW_PAYLOAD_V4: &str = "engine_newPayloadV4";
pub const ENGINE_FORKCHOICE_UPDATED_V3: &str = "engine_forkchoiceUpdatedV3";
pub const ENGINE_GET_PAYLOAD_V4: &str = "engine_getPayloadV4";

/// JSON-RPC error code engines use for an unknown payload id.
const UNKNOWN_PAYLOAD_CODE: i64 = -38001;

/// Payload status as it appears on the wire, tolerant of a missing or null
/// validation error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcPayloadStatus {
    status: String,
    #[serde(default)]
    validation_error: Option<String>,
}

/// Subset of the `engine_forkchoiceUpdatedV3` result we consume.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForkchoiceUpdatedResp {
    payload_status: RpcPayloadStatus,
    payload_id: Option<RpcPayloadId>,
}

/// Subset of the `engine_getPayloadV4` response envelope we consume. The
/// blobs bundle, builder-override flag, and execution requests are ignored
/// at decode time.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionPayloadEnvelopeV4 {
    execution_payload: ExecutionPayloadV3,
    block_value: U256,
}

/// Maps a wire status to a verdict, or `None` when the status string is not
/// one this method can produce.  `ACCEPTED` only counts for new payload
/// submissions, forkchoice updates never produce it.
fn block_status_from_wire(status: &RpcPayloadStatus, accepted_ok: bool) -> Option<BlockStatus> {
    match status.status.as_str() {
        "VALID" => Some(BlockStatus::Valid),
        "INVALID" => Some(BlockStatus::Invalid {
            validation_error: status.validation_error.clone(),
        }),
        "SYNCING" => Some(BlockStatus::Syncing),
        "ACCEPTED" if accepted_ok => Some(BlockStatus::Accepted),
        _ => None,
    }
}

fn to_rpc_attributes(env: PayloadEnv) -> PayloadAttributes {
    PayloadAttributes {
        timestamp: env.timestamp(),
        prev_randao: env.prev_randao().0,
        suggested_fee_recipient: Address::from(env.fee_recipient().0),
        withdrawals: Some(env.withdrawals().iter().copied().map(Into::into).collect()),
        parent_beacon_block_root: Some(env.parent_beacon_block_root().0),
    }
}

/// Engine API client that classifies raw engine envelopes into verdicts.
#[derive(Debug, Clone)]
pub struct RpcEngineClient<T: EngineTransport> {
    transport: T,
}

impl<T: EngineTransport> RpcEngineClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn send(&self, method: &str, params: serde_json::Value) -> EngineResult<JsonRpcResponse> {
        self.transport
            .send(JsonRpcRequest::new(method, params))
            .await
            .map_err(|e| {
                ENGINE_RPC_ERRORS_TOTAL.with_label_values(&[method]).inc();
                EngineError::Transport(e.to_string())
            })
    }

    /// Resolves a maybe-parsed status and a maybe-present error object into
    /// one verdict.  A usable status always wins.  A structured error
    /// without a status is the engine's way of rejecting the payload, so it
    /// becomes an invalid verdict carrying the engine's reason.
    fn resolve_status(
        &self,
        method: &str,
        status: Option<BlockStatus>,
        error: Option<JsonRpcError>,
    ) -> EngineResult<BlockStatus> {
        match (status, error) {
            (Some(status), None) => Ok(status),
            (Some(status), Some(err)) => {
                warn!(
                    %method,
                    code = err.code,
                    message = %err.message,
                    "discarding error beside usable engine status"
                );
                Ok(status)
            }
            (None, Some(err)) => {
                let validation_error = match err.data {
                    Some(serde_json::Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => err.message,
                };
                Ok(BlockStatus::Invalid {
                    validation_error: Some(validation_error),
                })
            }
            (None, None) => {
                error!(%method, "engine response carried neither status nor error");
                ENGINE_RPC_ERRORS_TOTAL.with_label_values(&[method]).inc();
                Err(EngineError::UnknownPayloadStatus) // should never happen
            }
        }
    }
}

#[async_trait]
impl<T: EngineTransport> EngineApi for RpcEngineClient<T> {
    async fn submit_payload(
        &self,
        payload: ElPayload,
        versioned_hashes: Vec<Buf32>,
        parent_beacon_block_root: Buf32,
        execution_requests: Vec<Vec<u8>>,
    ) -> EngineResult<BlockStatus> {
        let _timing = TimingGuard::for_method(ENGINE_NEW_PAYLOAD_V4);

        let rpc_payload = ExecutionPayloadV3::from(payload);
        let hashes: Vec<B256> = versioned_hashes.iter().map(|h| h.0).collect();
        let requests: Vec<Bytes> = execution_requests.into_iter().map(Bytes::from).collect();

        let params = json!([rpc_payload, hashes, parent_beacon_block_root.0, requests]);
        let resp = self.send(ENGINE_NEW_PAYLOAD_V4, params).await?;

        let status = resp
            .result
            .and_then(|v| serde_json::from_value::<RpcPayloadStatus>(v).ok())
            .and_then(|s| block_status_from_wire(&s, true));
        self.resolve_status(ENGINE_NEW_PAYLOAD_V4, status, resp.error)
    }

    async fn update_forkchoice(
        &self,
        target: ForkchoiceTarget,
        attrs: Option<PayloadEnv>,
    ) -> EngineResult<ForkchoiceResp> {
        let _timing = TimingGuard::for_method(ENGINE_FORKCHOICE_UPDATED_V3);

        let state = ForkchoiceState {
            head_block_hash: target.head().0,
            safe_block_hash: target.safe().0,
            finalized_block_hash: target.finalized().0,
        };
        let attrs = attrs.map(to_rpc_attributes);

        let resp = self
            .send(ENGINE_FORKCHOICE_UPDATED_V3, json!([state, attrs]))
            .await?;

        let (status, payload_id) = match resp
            .result
            .and_then(|v| serde_json::from_value::<ForkchoiceUpdatedResp>(v).ok())
        {
            Some(parsed) => (
                block_status_from_wire(&parsed.payload_status, false),
                parsed.payload_id.map(|id| PayloadId::new(id.0 .0)),
            ),
            None => (None, None),
        };

        let status = self.resolve_status(ENGINE_FORKCHOICE_UPDATED_V3, status, resp.error)?;
        Ok(ForkchoiceResp::new(status, payload_id))
    }

    async fn get_payload(&self, payload_id: PayloadId) -> EngineResult<BuiltPayload> {
        let _timing = TimingGuard::for_method(ENGINE_GET_PAYLOAD_V4);

        let rpc_id = RpcPayloadId::new(*payload_id.as_bytes());
        let resp = self.send(ENGINE_GET_PAYLOAD_V4, json!([rpc_id])).await?;

        if let Some(err) = resp.error {
            ENGINE_RPC_ERRORS_TOTAL
                .with_label_values(&[ENGINE_GET_PAYLOAD_V4])
                .inc();
            if err.code == UNKNOWN_PAYLOAD_CODE {
                return Err(EngineError::UnknownPayloadId(payload_id));
            }
            return Err(EngineError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let Some(result) = resp.result else {
            ENGINE_RPC_ERRORS_TOTAL
                .with_label_values(&[ENGINE_GET_PAYLOAD_V4])
                .inc();
            return Err(EngineError::Other(
                "empty engine_getPayloadV4 response".to_string(),
            ));
        };

        let envelope: ExecutionPayloadEnvelopeV4 = serde_json::from_value(result).map_err(|e| {
            ENGINE_RPC_ERRORS_TOTAL
                .with_label_values(&[ENGINE_GET_PAYLOAD_V4])
                .inc();
            EngineError::Other(format!("decoding engine_getPayloadV4 response: {e}"))
        })?;

        debug!(block_value = %envelope.block_value, "fetched built payload");

        Ok(BuiltPayload::new(envelope.execution_payload.into()))
    }
}
