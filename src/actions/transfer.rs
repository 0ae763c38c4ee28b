use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::actions::templates::{transfer_schema, TRANSFER_TEMPLATE};
use crate::actions::{
    extract_intent, finish, has_text, optional_address, required_address, required_amount,
    ActionOutcome,
};
use crate::chain::Operation;
use crate::interfaces::actions::{Action, ActionCallback, ActionExample, ActionReply, Message, State};
use crate::runtime::WalletRuntime;
use crate::units;

pub const NAME: &str = "SEND_TOKEN";

pub struct TransferAction {
    runtime: Arc<WalletRuntime>,
}

impl TransferAction {
    pub fn new(runtime: Arc<WalletRuntime>) -> Self {
        Self { runtime }
    }

    async fn run(&self, message: &Message, state: &State) -> ActionOutcome {
        let config = self.runtime.config()?;
        let wallet = self.runtime.wallet(&config)?;
        let intent = extract_intent(
            &self.runtime,
            &wallet,
            TRANSFER_TEMPLATE,
            &transfer_schema(),
            message,
            state,
        )
        .await?;

        let recipient = required_address(&intent, "recipient")?;
        let amount = required_amount(&intent, "amount")?;
        let token = optional_address(&intent, "token_address")?;
        let decimals = wallet.decimals_for(token.as_ref()).await?;
        let raw = units::to_raw(amount, decimals)?;

        let sender = wallet.require_account(&wallet.address()).await?;
        let hash = wallet
            .submit(
                sender.nonce,
                vec![Operation::Transfer {
                    to: recipient,
                    amount: raw,
                    token,
                }],
                &[],
            )
            .await?;
        wallet.confirm(&hash).await?;

        Ok(ActionReply::success(
            format!(
                "Sent {} to {recipient}. Transaction hash: {hash}",
                units::display(amount)
            ),
            json!({
                "recipient": recipient.to_string(),
                "amount": amount.to_string(),
                "token": token.map(|t| t.to_string()),
                "hash": hash,
            }),
        ))
    }
}

#[async_trait]
impl Action for TransferAction {
    fn name(&self) -> &str {
        NAME
    }

    fn similes(&self) -> &[&str] {
        &["TRANSFER_TOKEN", "SEND_TOKENS", "TRANSFER", "PAY"]
    }

    fn description(&self) -> &str {
        "Transfer native or token funds from the agent's wallet to another address"
    }

    fn examples(&self) -> Vec<Vec<ActionExample>> {
        vec![vec![
            ActionExample::user("Send 1.5 tokens to 7EcDhSYGxXyscszYEp35KHN8vvw3svAuLKTzXwCFLtV"),
            ActionExample::agent("Sending 1.5 tokens now.", NAME),
        ]]
    }

    fn validate(&self, message: &Message) -> bool {
        has_text(message) && self.runtime.config().is_ok()
    }

    async fn handle(&self, message: &Message, state: &State, callback: ActionCallback) -> bool {
        let outcome = self.run(message, state).await;
        finish(NAME, "Error transferring tokens", outcome, callback)
    }
}
