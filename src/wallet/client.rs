//! JSON-RPC wallet client
//!
//! Talks to a bitcoind-family node (Luckycoin, Dogecoin, ...) over HTTP with
//! basic authentication. Reads go through the configured [`RetryPolicy`];
//! `sendtoaddress` is sent exactly once since it is not idempotent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::WalletService;
use super::error::WalletError;
use super::retry::RetryPolicy;
use super::types::{AddressValidation, UnspentOutput};
use crate::config::RpcConfig;

/// JSON-RPC request structure
#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

/// JSON-RPC response structure
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Wallet service reached over the node's HTTP JSON-RPC interface
pub struct RpcWalletClient {
    client: reqwest::Client,
    url: String,
    user: String,
    password: String,
    retry: RetryPolicy,
    next_id: AtomicU64,
}

impl RpcWalletClient {
    pub fn new(config: &RpcConfig) -> Result<Self, WalletError> {
        let url = config.url();
        info!(url = %url, timeout_ms = config.timeout_ms, "Initializing wallet RPC client");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| WalletError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            user: config.user.clone(),
            password: config.password.clone(),
            retry: config.retry.clone(),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Single JSON-RPC round trip, no retry. `Ok(None)` is a `null` result.
    async fn call_once<R>(&self, method: &str, params: &[Value]) -> Result<Option<R>, WalletError>
    where
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| WalletError::Unavailable(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(WalletError::Unauthorized);
        }

        // The node reports RPC errors with HTTP 500 and a JSON body, so the
        // body is parsed before the status is judged.
        let body = response
            .bytes()
            .await
            .map_err(|e| WalletError::Unavailable(format!("Failed to read response: {}", e)))?;

        parse_response(method, status, &body)
    }

    /// JSON-RPC call with transient-failure retry. Only for idempotent methods.
    async fn call_optional<R>(&self, method: &str, params: &[Value]) -> Result<Option<R>, WalletError>
    where
        R: DeserializeOwned,
    {
        debug!(method, "Wallet RPC call");
        self.retry
            .run(method, || self.call_once(method, params))
            .await
    }

    /// Like [`Self::call_optional`] but a `null` result is an invalid response.
    async fn call<R>(&self, method: &str, params: &[Value]) -> Result<R, WalletError>
    where
        R: DeserializeOwned,
    {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| missing_result(method))
    }
}

fn missing_result(method: &str) -> WalletError {
    WalletError::InvalidResponse(format!("{}: no result in response", method))
}

fn parse_response<R>(
    method: &str,
    status: reqwest::StatusCode,
    body: &[u8],
) -> Result<Option<R>, WalletError>
where
    R: DeserializeOwned,
{
    let rpc_response: JsonRpcResponse<R> = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) if status.is_server_error() => {
            return Err(WalletError::Unavailable(format!(
                "{} returned HTTP {}: {}",
                method, status, e
            )));
        }
        Err(e) => {
            return Err(WalletError::InvalidResponse(format!(
                "{}: failed to parse response: {}",
                method, e
            )));
        }
    };

    if let Some(error) = rpc_response.error {
        return Err(WalletError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    Ok(rpc_response.result)
}

/// Amounts go over the wire as JSON numbers, like every bitcoind client does.
fn amount_param(amount: Decimal) -> Result<Value, WalletError> {
    amount
        .to_f64()
        .map(|v| json!(v))
        .ok_or_else(|| WalletError::InvalidResponse(format!("Amount {} not representable", amount)))
}

#[async_trait]
impl WalletService for RpcWalletClient {
    async fn block_count(&self) -> Result<u64, WalletError> {
        self.call("getblockcount", &[]).await
    }

    async fn block_hash(&self, height: u64) -> Result<String, WalletError> {
        self.call("getblockhash", &[json!(height)]).await
    }

    async fn list_unspent(
        &self,
        min_conf: u32,
        max_conf: u32,
        addresses: &[String],
    ) -> Result<Vec<UnspentOutput>, WalletError> {
        self.call(
            "listunspent",
            &[json!(min_conf), json!(max_conf), json!(addresses)],
        )
        .await
    }

    async fn import_address(
        &self,
        address: &str,
        label: &str,
        rescan: bool,
    ) -> Result<(), WalletError> {
        // importaddress answers with a null result on success
        let _: Option<Value> = self
            .call_optional("importaddress", &[json!(address), json!(label), json!(rescan)])
            .await?;
        Ok(())
    }

    async fn send_to_address(
        &self,
        address: &str,
        amount: Decimal,
        comment: &str,
        comment_to: &str,
        subtract_fee_from_amount: bool,
    ) -> Result<String, WalletError> {
        let params = [
            json!(address),
            amount_param(amount)?,
            json!(comment),
            json!(comment_to),
            json!(subtract_fee_from_amount),
        ];
        self.call_once("sendtoaddress", &params)
            .await?
            .ok_or_else(|| missing_result("sendtoaddress"))
    }

    async fn validate_address(&self, address: &str) -> Result<AddressValidation, WalletError> {
        self.call("validateaddress", &[json!(address)]).await
    }

    async fn received_by_address(&self, address: &str) -> Result<Decimal, WalletError> {
        self.call("getreceivedbyaddress", &[json!(address)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn local_config(port: u16) -> RpcConfig {
        RpcConfig {
            user: "user".to_string(),
            password: "pass".to_string(),
            host: "127.0.0.1".to_string(),
            port,
            timeout_ms: 2_000,
            retry: RetryPolicy::no_retry(),
        }
    }

    #[test]
    fn test_request_serialization() {
        let params = [json!(0), json!(9_999_999), json!(["LPlayer"])];
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id: 7,
            method: "listunspent",
            params: &params,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "listunspent");
        assert_eq!(value["id"], 7);
        assert_eq!(value["params"][2][0], "LPlayer");
    }

    #[test]
    fn test_parse_result() {
        let body = br#"{"result": 812345, "error": null, "id": 0}"#;
        let height: Option<u64> = parse_response("getblockcount", StatusCode::OK, body).unwrap();
        assert_eq!(height, Some(812345));
    }

    #[test]
    fn test_parse_rpc_error_on_http_500() {
        let body = br#"{"result": null, "error": {"code": -8, "message": "Block height out of range"}, "id": 0}"#;
        let err = parse_response::<String>("getblockhash", StatusCode::INTERNAL_SERVER_ERROR, body)
            .unwrap_err();
        assert_eq!(
            err,
            WalletError::Rpc {
                code: -8,
                message: "Block height out of range".to_string()
            }
        );
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_response::<u64>("getblockcount", StatusCode::OK, b"<html>").unwrap_err();
        assert!(matches!(err, WalletError::InvalidResponse(_)));

        let err = parse_response::<u64>("getblockcount", StatusCode::BAD_GATEWAY, b"<html>")
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_null_result() {
        let body = br#"{"result": null, "error": null, "id": 0}"#;
        let result = parse_response::<Value>("importaddress", StatusCode::OK, body).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_amount_param() {
        assert_eq!(amount_param(Decimal::new(15, 1)).unwrap(), json!(1.5));
        assert_eq!(amount_param(Decimal::from(3)).unwrap(), json!(3.0));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transient() {
        // Port 1 is reserved (tcpmux) and closed on any sane test host
        let client = RpcWalletClient::new(&local_config(1)).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:1");

        let err = client.block_count().await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err:?}");
    }
}
