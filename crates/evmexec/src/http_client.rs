use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_rpc_types_engine::{Claims, JwtSecret};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine clients are expected to answer well within this.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("jwt: {0}")]
    Jwt(String),

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A JSON-RPC request object.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: serde_json::Value,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id: 1,
        }
    }
}

/// A JSON-RPC response envelope, with the result left unparsed so callers
/// can inspect the status and error object together.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    pub result: Option<serde_json::Value>,
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC error object.
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Transport carrying raw engine API envelopes.  Split from the engine
/// client so response classification can be exercised against canned
/// envelopes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EngineTransport: Send + Sync {
    async fn send(&self, req: JsonRpcRequest) -> TransportResult<JsonRpcResponse>;
}

/// HTTP transport authenticated with a JWT bearer token per request.
#[derive(Debug, Clone)]
pub struct HttpEngineTransport {
    client: reqwest::Client,
    url: String,
    secret: Option<JwtSecret>,
}

impl HttpEngineTransport {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to create http client");

        Self {
            client,
            url,
            secret: None,
        }
    }

    pub fn from_url_secret(url: String, secret: JwtSecret) -> Self {
        let mut transport = Self::new(url);
        transport.secret = Some(secret);
        transport
    }
}

/// Claims with a fresh issued-at.  Engine clients reject tokens whose `iat`
/// is more than 60s old, so we mint one per request instead of caching.
fn claims_now() -> Claims {
    let iat = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Claims { iat, exp: None }
}

#[async_trait]
impl EngineTransport for HttpEngineTransport {
    async fn send(&self, req: JsonRpcRequest) -> TransportResult<JsonRpcResponse> {
        let mut builder = self.client.post(&self.url).json(&req);

        if let Some(secret) = &self.secret {
            let token = secret
                .encode(&claims_now())
                .map_err(|e| TransportError::Jwt(e.to_string()))?;
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await?.error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
