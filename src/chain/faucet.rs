use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::config::NetworkContext;
use crate::error::{LedgerPilotError, Result};
use crate::keys::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetReceipt {
    pub status: String,
    pub message: Option<String>,
    pub hash: Option<String>,
}

pub struct FaucetClient {
    url: String,
    network: String,
    http: reqwest::Client,
}

impl FaucetClient {
    pub fn new(network: &NetworkContext) -> Result<Self> {
        let url = network.faucet_url.clone().ok_or_else(|| {
            LedgerPilotError::Config(format!("no faucet is available on {}", network.network))
        })?;
        let http = reqwest::Client::builder()
            .timeout(network.http_timeout)
            .build()
            .map_err(|e| LedgerPilotError::Http(format!("failed to build http client: {e}")))?;
        Ok(Self {
            url,
            network: network.network.as_str().to_string(),
            http,
        })
    }

    pub async fn request_funds(&self, address: &Address) -> Result<FaucetReceipt> {
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "network": self.network, "address": address.to_string() }))
            .send()
            .await
            .map_err(|e| LedgerPilotError::NetworkUnavailable(format!("faucet transport failure: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| LedgerPilotError::NetworkUnavailable(format!("faucet decode failure: {e}")))?;

        if !status.is_success() {
            return Err(LedgerPilotError::NetworkUnavailable(format!(
                "faucet http {status}: {}",
                body_message(&body).unwrap_or_else(|| body.to_string())
            )));
        }

        let reported = body
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("success")
            .to_ascii_lowercase();
        let message = body_message(&body);
        if reported != "success" && reported != "ok" {
            return Err(LedgerPilotError::ChainRejected(format!(
                "faucet refused request: {}",
                message.unwrap_or(reported)
            )));
        }

        info!(%address, network = %self.network, "faucet request accepted");
        Ok(FaucetReceipt {
            status: reported,
            message,
            hash: body
                .get("hash")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

fn body_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
