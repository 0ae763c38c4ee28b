use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::actions::templates::{faucet_schema, FAUCET_TEMPLATE};
use crate::actions::{extract_intent, finish, has_text, optional_address, ActionOutcome};
use crate::interfaces::actions::{Action, ActionCallback, ActionExample, ActionReply, Message, State};
use crate::runtime::WalletRuntime;

pub const NAME: &str = "REQUEST_FAUCET";

pub struct FaucetAction {
    runtime: Arc<WalletRuntime>,
}

impl FaucetAction {
    pub fn new(runtime: Arc<WalletRuntime>) -> Self {
        Self { runtime }
    }

    async fn run(&self, message: &Message, state: &State) -> ActionOutcome {
        let config = self.runtime.config()?;
        // Mainnet has no faucet; fail before spending a model call.
        let faucet = self.runtime.faucet(&config)?;
        let wallet = self.runtime.wallet(&config)?;
        let intent = extract_intent(
            &self.runtime,
            &wallet,
            FAUCET_TEMPLATE,
            &faucet_schema(),
            message,
            state,
        )
        .await?;
        let address = optional_address(&intent, "address")?.unwrap_or_else(|| wallet.address());

        let receipt = faucet.request_funds(&address).await?;
        let note = receipt
            .message
            .clone()
            .unwrap_or_else(|| "funds are on their way".to_string());
        Ok(ActionReply::success(
            format!(
                "Faucet request for {address} on {} succeeded: {note}",
                config.network.network
            ),
            json!({
                "address": address.to_string(),
                "network": config.network.network,
                "message": receipt.message,
                "hash": receipt.hash,
            }),
        ))
    }
}

#[async_trait]
impl Action for FaucetAction {
    fn name(&self) -> &str {
        NAME
    }

    fn similes(&self) -> &[&str] {
        &["GET_TEST_TOKENS", "FUND_WALLET", "FAUCET"]
    }

    fn description(&self) -> &str {
        "Request test funds from the network faucet for the agent's wallet or another address"
    }

    fn examples(&self) -> Vec<Vec<ActionExample>> {
        vec![vec![
            ActionExample::user("Can you get some test tokens from the faucet?"),
            ActionExample::agent("Requesting funds from the faucet for your wallet.", NAME),
        ]]
    }

    fn validate(&self, message: &Message) -> bool {
        has_text(message) && self.runtime.config().is_ok()
    }

    async fn handle(&self, message: &Message, state: &State, callback: ActionCallback) -> bool {
        let outcome = self.run(message, state).await;
        finish(NAME, "Faucet request failed", outcome, callback)
    }
}
