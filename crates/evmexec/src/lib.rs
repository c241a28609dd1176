//! Engine API client for driving an EVM execution engine over authenticated
//! JSON-RPC.

pub mod engine;
mod http_client;

pub use http_client::{
    EngineTransport, HttpEngineTransport, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    TransportError, TransportResult,
};
