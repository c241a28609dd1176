use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::el_payload::ElPayload;

/// The proposal message carrying a candidate execution payload.
///
/// Two encodings exist for backward compatibility: the typed borsh encoding
/// and the legacy JSON encoding in the engine's wire shape. Exactly one must
/// be populated; validation rejects a message with both or neither.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Arbitrary)]
pub struct ProposedPayload {
    payload: Option<Vec<u8>>,
    payload_json: Option<Vec<u8>>,
}

impl ProposedPayload {
    /// Raw constructor, mostly useful for exercising the validation paths.
    pub fn new(payload: Option<Vec<u8>>, payload_json: Option<Vec<u8>>) -> Self {
        Self {
            payload,
            payload_json,
        }
    }

    /// Packages a payload using the typed borsh encoding.
    pub fn from_payload(payload: &ElPayload) -> std::io::Result<Self> {
        Ok(Self {
            payload: Some(payload.to_borsh_bytes()?),
            payload_json: None,
        })
    }

    /// Packages a payload using the legacy JSON encoding.
    pub fn from_json_payload(payload: &ElPayload) -> serde_json::Result<Self> {
        Ok(Self {
            payload: None,
            payload_json: Some(payload.to_json_bytes()?),
        })
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn payload_json(&self) -> Option<&[u8]> {
        self.payload_json.as_deref()
    }
}
