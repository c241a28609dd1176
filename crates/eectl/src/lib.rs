//! Infrastructure for controlling an EVM execution engine.  This operates on
//! the same principles as the Ethereum engine API used by CL clients to
//! control their corresponding EL client, but is defined in terms of driver
//! semantics so the EL impl can translate to whatever wire types it needs.

pub mod engine;
pub mod errors;
pub mod messages;
