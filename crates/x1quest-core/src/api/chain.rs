//! Read-only JSON-RPC queries against the X1 EcoChain node.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::transport::{HttpRequest, Transport};
use super::ApiError;

/// Native token decimals
const WEI_DECIMALS: usize = 18;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<Value>,
}

/// Native balance of a wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub address: String,
    pub wei: String,
    /// Decimal amount in X1T
    pub balance: String,
}

pub struct ChainClient {
    transport: Arc<dyn Transport>,
    rpc_url: String,
}

impl ChainClient {
    pub fn new(transport: Arc<dyn Transport>, rpc_url: impl Into<String>) -> Self {
        Self {
            transport,
            rpc_url: rpc_url.into(),
        }
    }

    pub async fn get_balance(&self, address: &str) -> Result<Balance, ApiError> {
        let result = self.call("eth_getBalance", json!([address, "latest"])).await?;
        let hex_wei = result
            .as_str()
            .ok_or_else(|| ApiError::InvalidResponse(format!("Unexpected balance: {}", result)))?;
        let wei = u128::from_str_radix(hex_wei.trim_start_matches("0x"), 16)
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid balance {}: {}", hex_wei, e)))?;

        Ok(Balance {
            address: address.to_string(),
            wei: wei.to_string(),
            balance: format_units(wei, WEI_DECIMALS),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        debug!(method = method, "JSON-RPC call");
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let request = HttpRequest {
            method: Method::POST,
            url: self.rpc_url.clone(),
            query: Vec::new(),
            headers,
            body: Some(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            })),
        };

        let response = self.transport.send(request).await?;
        if !response.status.is_success() {
            return Err(ApiError::from_status(response.status, &response.body));
        }

        let parsed: RpcResponse = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid JSON-RPC response: {}", e)))?;
        if let Some(error) = parsed.error {
            return Err(ApiError::Remote {
                status: response.status.as_u16(),
                message: super::error::describe_error(&error),
            });
        }
        parsed
            .result
            .ok_or_else(|| ApiError::InvalidResponse("JSON-RPC response has no result".to_string()))
    }
}

/// Render an integer amount with `decimals` implied decimal places,
/// trimming trailing zeros.
pub fn format_units(amount: u128, decimals: usize) -> String {
    let digits = format!("{:0>width$}", amount, width = decimals + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}
