use alloy_eips::eip4895::Withdrawal;
use alloy_primitives::{Address, B256, U256};
use alloy_rpc_types_engine::{ExecutionPayloadV1, ExecutionPayloadV2, ExecutionPayloadV3};
use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use tenon_primitives::buf::{Buf20, Buf32};

/// Typed execution payload as carried in proposals and handed to the engine.
///
/// Mirrors the engine's V3 payload shape field for field, plus an optional
/// execution witness that the protocol rejects at validation time.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Arbitrary)]
pub struct ElPayload {
    /// The parent hash of the block.
    pub parent_hash: Buf32,
    /// The fee recipient of the block.
    pub fee_recipient: Buf20,
    /// The state root of the block.
    pub state_root: Buf32,
    /// The receipts root of the block.
    pub receipts_root: Buf32,
    /// The logs bloom of the block.
    pub logs_bloom: [u8; 256],
    /// The previous randao of the block.
    pub prev_randao: Buf32,
    /// The block number.
    pub block_number: u64,
    /// The gas limit of the block.
    pub gas_limit: u64,
    /// The gas used of the block.
    pub gas_used: u64,
    /// The timestamp of the block.
    pub timestamp: u64,
    /// The extra data of the block.
    pub extra_data: Vec<u8>,
    /// The base fee per gas of the block.
    pub base_fee_per_gas: Buf32,
    /// The block hash of the block.
    pub block_hash: Buf32,
    /// The transactions of the block, each RLP encoded.
    pub transactions: Vec<Vec<u8>>,
    /// The withdrawals included in the block, FIFO order.
    pub withdrawals: Vec<ElWithdrawal>,
    /// Blob gas used by the block.
    pub blob_gas_used: u64,
    /// Excess blob gas of the block.
    pub excess_blob_gas: u64,
    /// Optional stateless execution witness. Never allowed in proposals.
    pub witness: Option<Vec<u8>>,
}

/// An EIP-4895 style withdrawal as carried inside [`ElPayload`].
///
/// `index` is the store-assigned withdrawal queue id and `validator_index`
/// is always zero in this protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Arbitrary)]
pub struct ElWithdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: Buf20,
    pub amount_gwei: u64,
}

impl ElPayload {
    /// Decodes from the typed borsh encoding.
    pub fn from_borsh_bytes(buf: &[u8]) -> std::io::Result<Self> {
        borsh::from_slice(buf)
    }

    /// Encodes into the typed borsh encoding.
    pub fn to_borsh_bytes(&self) -> std::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }

    /// Decodes from the legacy JSON encoding, which is the engine's own V3
    /// wire shape. A payload decoded this way never carries a witness.
    pub fn from_json_bytes(buf: &[u8]) -> serde_json::Result<Self> {
        let payload: ExecutionPayloadV3 = serde_json::from_slice(buf)?;
        Ok(payload.into())
    }

    /// Encodes into the legacy JSON encoding. The witness field has no wire
    /// counterpart and is dropped.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&ExecutionPayloadV3::from(self.clone()))
    }
}

impl From<Withdrawal> for ElWithdrawal {
    fn from(value: Withdrawal) -> Self {
        Self {
            index: value.index,
            validator_index: value.validator_index,
            address: value.address.0 .0.into(),
            amount_gwei: value.amount,
        }
    }
}

impl From<ElWithdrawal> for Withdrawal {
    fn from(value: ElWithdrawal) -> Self {
        Self {
            index: value.index,
            validator_index: value.validator_index,
            address: Address::from(value.address.0),
            amount: value.amount_gwei,
        }
    }
}

impl From<ExecutionPayloadV3> for ElPayload {
    fn from(value: ExecutionPayloadV3) -> Self {
        let v2 = value.payload_inner;
        let v1 = v2.payload_inner;
        ElPayload {
            parent_hash: v1.parent_hash.0.into(),
            fee_recipient: v1.fee_recipient.0 .0.into(),
            state_root: v1.state_root.0.into(),
            receipts_root: v1.receipts_root.0.into(),
            logs_bloom: v1.logs_bloom.0.into(),
            prev_randao: v1.prev_randao.0.into(),
            block_number: v1.block_number,
            gas_limit: v1.gas_limit,
            gas_used: v1.gas_used,
            timestamp: v1.timestamp,
            extra_data: v1.extra_data.into(),
            base_fee_per_gas: B256::from(v1.base_fee_per_gas).0.into(),
            block_hash: v1.block_hash.0.into(),
            transactions: v1
                .transactions
                .into_iter()
                .map(|bytes| bytes.0.into())
                .collect(),
            withdrawals: v2.withdrawals.into_iter().map(Into::into).collect(),
            blob_gas_used: value.blob_gas_used,
            excess_blob_gas: value.excess_blob_gas,
            witness: None,
        }
    }
}

impl From<ElPayload> for ExecutionPayloadV3 {
    fn from(value: ElPayload) -> Self {
        ExecutionPayloadV3 {
            payload_inner: ExecutionPayloadV2 {
                payload_inner: ExecutionPayloadV1 {
                    parent_hash: value.parent_hash.0,
                    fee_recipient: value.fee_recipient.0.into(),
                    state_root: value.state_root.0,
                    receipts_root: value.receipts_root.0,
                    logs_bloom: value.logs_bloom.into(),
                    prev_randao: value.prev_randao.0,
                    block_number: value.block_number,
                    gas_limit: value.gas_limit,
                    gas_used: value.gas_used,
                    timestamp: value.timestamp,
                    extra_data: value.extra_data.into(),
                    base_fee_per_gas: U256::from_be_bytes(value.base_fee_per_gas.0 .0),
                    block_hash: value.block_hash.0,
                    transactions: value.transactions.into_iter().map(Into::into).collect(),
                },
                withdrawals: value.withdrawals.into_iter().map(Into::into).collect(),
            },
            blob_gas_used: value.blob_gas_used,
            excess_blob_gas: value.excess_blob_gas,
        }
    }
}
