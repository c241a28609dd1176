//! Storage interface for the consensus-side execution state.

pub mod errors;
pub mod traits;

pub use errors::DbResult;
