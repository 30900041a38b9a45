//! Balance oracle client.
//!
//! The core only ever sees three operations; everything about transport,
//! authentication and retries stays behind this trait. Transport failures are
//! retried with bounded exponential backoff inside the client; once retries
//! are exhausted the error surfaces as [`OracleError::Unreachable`] and the
//! session fails closed. RPC-level errors for a single address are contained
//! per candidate and never halt the session.

use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use crate::config::ScanConfig;
use crate::types::NodeInfo;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("node unreachable: {0}")]
    Unreachable(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed rpc response: {0}")]
    Protocol(String),
}

pub trait BalanceOracle: Send + Sync {
    /// Must succeed before a session starts or continues.
    fn verify_live_node(&self) -> Result<(), OracleError>;

    fn get_node_info(&self) -> Result<NodeInfo, OracleError>;

    /// Balance in whole coins; `> 0` defines a hit.
    fn verify_wallet(&self, address: &str) -> Result<f64, OracleError>;
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_retry_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn next_delay(&self, current: Duration) -> Duration {
        Duration::from_secs_f64(
            (current.as_secs_f64() * self.backoff_multiplier)
                .min(self.max_retry_delay.as_secs_f64()),
        )
    }
}

/// JSON-RPC client for a Bitcoin-style node with an address index.
pub struct NodeRpcClient {
    http: reqwest::blocking::Client,
    url: String,
    auth: Option<(String, String)>,
    retry: RetryConfig,
}

impl NodeRpcClient {
    pub fn new(config: &ScanConfig) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.rpc_timeout())
            .build()?;
        let auth = match (&config.rpc_user, &config.rpc_pass) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };
        Ok(Self {
            http,
            url: config.rpc_url.clone(),
            auth,
            retry: RetryConfig {
                max_retries: config.rpc_max_retries,
                retry_delay: Duration::from_millis(config.rpc_retry_delay_ms),
                ..RetryConfig::default()
            },
        })
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, OracleError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "wallet-scanner",
            "method": method,
            "params": params,
        });

        let mut delay = self.retry.retry_delay;
        let mut last_error = String::new();
        for attempt in 0..=self.retry.max_retries {
            let mut request = self.http.post(&self.url).json(&body);
            if let Some((user, pass)) = &self.auth {
                request = request.basic_auth(user, Some(pass));
            }
            match request.send() {
                Ok(response) => {
                    let parsed: Value = response
                        .json()
                        .map_err(|e| OracleError::Protocol(e.to_string()))?;
                    if let Some(err) = parsed.get("error").filter(|e| !e.is_null()) {
                        return Err(OracleError::Rpc {
                            code: err.get("code").and_then(Value::as_i64).unwrap_or(-1),
                            message: err
                                .get("message")
                                .and_then(Value::as_str)
                                .unwrap_or("unknown")
                                .to_string(),
                        });
                    }
                    return parsed
                        .get("result")
                        .cloned()
                        .ok_or_else(|| OracleError::Protocol("missing result field".to_string()));
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < self.retry.max_retries {
                        warn!(method, attempt, error = %last_error, "rpc transport error, retrying");
                        std::thread::sleep(delay);
                        delay = self.retry.next_delay(delay);
                    }
                }
            }
        }
        Err(OracleError::Unreachable(last_error))
    }
}

impl BalanceOracle for NodeRpcClient {
    fn verify_live_node(&self) -> Result<(), OracleError> {
        self.call("getblockchaininfo", json!([])).map(|_| ())
    }

    fn get_node_info(&self) -> Result<NodeInfo, OracleError> {
        let chain_info = self.call("getblockchaininfo", json!([]))?;
        // Peer count is informational only; nodes without getconnectioncount
        // still yield a usable snapshot.
        let peer_count = self
            .call("getconnectioncount", json!([]))
            .ok()
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(NodeInfo {
            chain: chain_info
                .get("chain")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            block_height: chain_info
                .get("blocks")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            peer_count,
        })
    }

    fn verify_wallet(&self, address: &str) -> Result<f64, OracleError> {
        let result = self.call(
            "getaddressbalance",
            json!([{ "addresses": [address] }]),
        )?;
        let satoshis = result
            .get("balance")
            .and_then(Value::as_i64)
            .ok_or_else(|| OracleError::Protocol("missing balance field".to_string()))?;
        Ok(satoshis as f64 / 100_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 5,
            retry_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_retry_delay: Duration::from_secs(2),
        };
        let d1 = retry.next_delay(retry.retry_delay);
        assert_eq!(d1, Duration::from_secs(1));
        let d2 = retry.next_delay(d1);
        assert_eq!(d2, Duration::from_secs(2));
        let d3 = retry.next_delay(d2);
        assert_eq!(d3, Duration::from_secs(2));
    }
}
