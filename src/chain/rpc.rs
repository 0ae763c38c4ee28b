use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::chain::{AccountState, ChainClient, SignedTransaction, TokenInfo, TxStatus};
use crate::config::NetworkContext;
use crate::error::{LedgerPilotError, Result};
use crate::keys::{Address, TokenId};

/// JSON-RPC error code nodes use for unknown accounts.
pub const ACCOUNT_NOT_FOUND_CODE: i64 = -32004;

const MAX_TOKEN_DECIMALS: u32 = 18;

enum RpcOutcome {
    Result(Value),
    Error { code: i64, message: String },
}

fn normalize_rpc_body(value: Value, method: &str) -> Result<RpcOutcome> {
    if let Some(error) = value.get("error") {
        let code = error.get("code").and_then(|v| v.as_i64()).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Ok(RpcOutcome::Error { code, message });
    }

    value
        .get("result")
        .cloned()
        .map(RpcOutcome::Result)
        .ok_or_else(|| {
            LedgerPilotError::NetworkUnavailable(format!("rpc {method} missing result"))
        })
}

pub struct RpcChainClient {
    endpoint: String,
    http: reqwest::Client,
    network: NetworkContext,
}

impl RpcChainClient {
    pub fn new(network: &NetworkContext) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(network.http_timeout)
            .build()
            .map_err(|e| LedgerPilotError::Http(format!("failed to build http client: {e}")))?;
        Ok(Self {
            endpoint: network.rpc_url.clone(),
            http,
            network: network.clone(),
        })
    }

    async fn rpc_request(&self, method: &str, params: Value) -> Result<RpcOutcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                LedgerPilotError::NetworkUnavailable(format!("rpc {method} transport failure: {e}"))
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            LedgerPilotError::NetworkUnavailable(format!("rpc {method} decode failure: {e}"))
        })?;

        if !status.is_success() {
            return Err(LedgerPilotError::NetworkUnavailable(format!(
                "rpc {method} http {status}: {body}"
            )));
        }

        normalize_rpc_body(body, method)
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value> {
        match self.rpc_request(method, params).await? {
            RpcOutcome::Result(value) => Ok(value),
            RpcOutcome::Error { code, message } => Err(LedgerPilotError::ChainRejected(format!(
                "rpc {method} error {code}: {message}"
            ))),
        }
    }

    pub async fn transaction_status(&self, hash: &str) -> Result<TxStatus> {
        let result = self.rpc_call("getTransactionStatus", json!([hash])).await?;
        serde_json::from_value(result).map_err(|e| {
            LedgerPilotError::NetworkUnavailable(format!(
                "rpc getTransactionStatus unexpected payload: {e}"
            ))
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn fetch_account(
        &self,
        address: &Address,
        token: Option<&TokenId>,
    ) -> Result<Option<AccountState>> {
        let mut options = json!({});
        if let Some(token) = token {
            options["token"] = json!(token.to_string());
        }

        let result = match self
            .rpc_request("getAccount", json!([address.to_string(), options]))
            .await?
        {
            RpcOutcome::Result(value) => value,
            RpcOutcome::Error { code, .. } if code == ACCOUNT_NOT_FOUND_CODE => {
                debug!(%address, "account not found on chain");
                return Ok(None);
            }
            RpcOutcome::Error { code, message } => {
                return Err(LedgerPilotError::NetworkUnavailable(format!(
                    "rpc getAccount error {code}: {message}"
                )));
            }
        };

        if result.is_null() {
            debug!(%address, "account not found on chain");
            return Ok(None);
        }

        let balance = read_u64_field(&result, "balance")?;
        let nonce = read_u64_field(&result, "nonce")?;
        Ok(Some(AccountState { balance, nonce }))
    }

    async fn fetch_token(&self, token: &TokenId) -> Result<Option<TokenInfo>> {
        let result = match self
            .rpc_request("getTokenInfo", json!([token.to_string()]))
            .await?
        {
            RpcOutcome::Result(value) => value,
            RpcOutcome::Error { code, .. } if code == ACCOUNT_NOT_FOUND_CODE => {
                debug!(%token, "token not found on chain");
                return Ok(None);
            }
            RpcOutcome::Error { code, message } => {
                return Err(LedgerPilotError::NetworkUnavailable(format!(
                    "rpc getTokenInfo error {code}: {message}"
                )));
            }
        };

        if result.is_null() {
            debug!(%token, "token not found on chain");
            return Ok(None);
        }

        let symbol = result
            .get("symbol")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let decimals = read_u64_field(&result, "decimals")?;
        let decimals = u32::try_from(decimals)
            .ok()
            .filter(|d| *d <= MAX_TOKEN_DECIMALS)
            .ok_or_else(|| {
                LedgerPilotError::NetworkUnavailable(format!(
                    "rpc getTokenInfo invalid decimals: {decimals}"
                ))
            })?;
        Ok(Some(TokenInfo { symbol, decimals }))
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<String> {
        let encoded = tx.to_base64()?;
        let result = self
            .rpc_call(
                "sendTransaction",
                json!([encoded, {"network": self.network.network.as_str()}]),
            )
            .await?;

        result
            .get("hash")
            .or(Some(&result))
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                LedgerPilotError::ChainRejected("rpc sendTransaction missing hash".to_string())
            })
    }

    async fn wait_for_inclusion(&self, hash: &str) -> Result<()> {
        for poll in 0..self.network.inclusion_max_polls {
            match self.transaction_status(hash).await? {
                TxStatus::Included => return Ok(()),
                TxStatus::Failed { error } => {
                    return Err(LedgerPilotError::ChainRejected(format!(
                        "transaction {hash} failed: {error}"
                    )));
                }
                TxStatus::Pending => {
                    debug!(hash, poll, "transaction pending");
                    tokio::time::sleep(self.network.inclusion_poll_interval).await;
                }
            }
        }
        Err(LedgerPilotError::NetworkUnavailable(format!(
            "transaction {hash} not included after {} polls",
            self.network.inclusion_max_polls
        )))
    }
}

/// Nodes encode amounts either as JSON integers or as decimal strings.
fn read_u64_field(value: &Value, field: &str) -> Result<u64> {
    let raw = value.get(field).ok_or_else(|| {
        LedgerPilotError::NetworkUnavailable(format!("rpc response missing {field}"))
    })?;
    raw.as_u64()
        .or_else(|| raw.as_str().and_then(|text| text.parse::<u64>().ok()))
        .ok_or_else(|| {
            LedgerPilotError::NetworkUnavailable(format!("rpc response invalid {field}: {raw}"))
        })
}
