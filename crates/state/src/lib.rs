//! Consensus-side execution state types.
//!
//! These are the types the consensus layer persists or carries in proposals,
//! kept separate from the engine's wire types so the storage and validation
//! logic stays independent of the RPC surface.

pub mod el_payload;
pub mod head;
pub mod proposal;
pub mod withdrawal;

pub use el_payload::{ElPayload, ElWithdrawal};
pub use head::ExecutionHead;
pub use proposal::ProposedPayload;
pub use withdrawal::WithdrawalEntry;
