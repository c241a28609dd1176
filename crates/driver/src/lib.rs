//! Consensus-side driver for an Ethereum-style execution engine.
//!
//! The driver sits between the consensus round lifecycle and the engine
//! protocol client.  Per round it can speculatively build a payload ahead of
//! this node's proposer turn, produce the proposal when the turn arrives,
//! validate proposals from other nodes, and apply the committed payload to
//! the engine and the state store.

pub mod config;
pub mod errors;
pub mod events;
pub mod providers;
pub mod verification;

mod builder;
mod commit;
mod driver;

pub use driver::{ConsensusRound, EngineDriver, OptimisticPayload};
