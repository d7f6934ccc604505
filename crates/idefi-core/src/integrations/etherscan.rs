//! Etherscan client for on-chain code lookup

use async_trait::async_trait;
use serde_json::Value;

use super::{json_response, CodeLookup};
use crate::error::ExternalError;

const SERVICE: &str = "Etherscan";

/// Etherscan REST client
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl EtherscanClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
        }
    }
}

/// Extract the bytecode from an `eth_getCode` response
///
/// Proxy-module success looks like `{"jsonrpc": "2.0", "result": "0x..."}`;
/// API-level failures come back as `{"status": "0", "message": "NOTOK", "result": "<reason>"}`.
fn code_from_response(body: &Value) -> Result<String, ExternalError> {
    if body.get("status").and_then(Value::as_str) == Some("0") {
        let reason = body
            .get("result")
            .and_then(Value::as_str)
            .or_else(|| body.get("message").and_then(Value::as_str))
            .unwrap_or("unknown error");
        return Err(ExternalError::invalid(SERVICE, reason));
    }
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ExternalError::invalid(SERVICE, message));
    }
    body.get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ExternalError::invalid(SERVICE, "missing result"))
}

#[async_trait]
impl CodeLookup for EtherscanClient {
    async fn code_at(&self, address: &str) -> Result<String, ExternalError> {
        let mut params = vec![
            ("module", "proxy"),
            ("action", "eth_getCode"),
            ("address", address),
            ("tag", "latest"),
        ];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("apikey", key));
        }

        let response = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ExternalError::request(SERVICE, e))?;

        let body = json_response(SERVICE, response).await?;
        code_from_response(&body)
    }
}
