use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::actions::templates::{batch_transfer_schema, BATCH_TRANSFER_TEMPLATE};
use crate::actions::{
    extract_intent, finish, has_text, required_amount, required_string_list, ActionFailure,
    ActionOutcome,
};
use crate::chain::Operation;
use crate::error::Result;
use crate::interfaces::actions::{Action, ActionCallback, ActionExample, ActionReply, Message, State};
use crate::keys::Address;
use crate::runtime::WalletRuntime;
use crate::units;

pub const NAME: &str = "BATCH_SEND_TOKEN";

pub struct BatchTransferAction {
    runtime: Arc<WalletRuntime>,
}

impl BatchTransferAction {
    pub fn new(runtime: Arc<WalletRuntime>) -> Self {
        Self { runtime }
    }

    async fn run(&self, message: &Message, state: &State) -> ActionOutcome {
        let config = self.runtime.config()?;
        let wallet = self.runtime.wallet(&config)?;
        let intent = extract_intent(
            &self.runtime,
            &wallet,
            BATCH_TRANSFER_TEMPLATE,
            &batch_transfer_schema(),
            message,
            state,
        )
        .await?;

        // Every recipient is checked before anything is submitted.
        let recipients = required_string_list(&intent, "recipients")?
            .iter()
            .map(|text| text.parse::<Address>())
            .collect::<Result<Vec<_>>>()?;
        let amount = required_amount(&intent, "amount")?;
        let raw = units::to_raw(amount, config.network.decimals)?;

        let sender = wallet.require_account(&wallet.address()).await?;
        let mut nonce = sender.nonce;
        let mut submitted: Vec<Value> = Vec::with_capacity(recipients.len());

        for recipient in &recipients {
            let result = async {
                let hash = wallet
                    .submit(
                        nonce,
                        vec![Operation::Transfer {
                            to: *recipient,
                            amount: raw,
                            token: None,
                        }],
                        &[],
                    )
                    .await?;
                submitted.push(json!({ "recipient": recipient.to_string(), "hash": hash }));
                wallet.confirm(&hash).await
            }
            .await;

            if let Err(error) = result {
                let mut details = Map::new();
                details.insert("failed_recipient".to_string(), json!(recipient.to_string()));
                details.insert("submitted".to_string(), Value::Array(submitted));
                return Err(ActionFailure::with_details(error, details));
            }
            info!(%recipient, nonce, "batch transfer leg submitted");
            nonce += 1;
        }

        Ok(ActionReply::success(
            format!(
                "Sent {} to each of {} recipients.",
                units::display(amount),
                recipients.len()
            ),
            json!({
                "amount": amount.to_string(),
                "submitted": submitted,
            }),
        ))
    }
}

#[async_trait]
impl Action for BatchTransferAction {
    fn name(&self) -> &str {
        NAME
    }

    fn similes(&self) -> &[&str] {
        &["BATCH_TRANSFER", "SEND_TO_MANY", "AIRDROP"]
    }

    fn description(&self) -> &str {
        "Send the same amount to several addresses, one transaction per recipient, in order"
    }

    fn examples(&self) -> Vec<Vec<ActionExample>> {
        vec![vec![
            ActionExample::user(
                "Send 2 tokens each to 7EcDhSYGxXyscszYEp35KHN8vvw3svAuLKTzXwCFLtV and 4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T",
            ),
            ActionExample::agent("Sending 2 tokens to each recipient.", NAME),
        ]]
    }

    fn validate(&self, message: &Message) -> bool {
        has_text(message) && self.runtime.config().is_ok()
    }

    async fn handle(&self, message: &Message, state: &State, callback: ActionCallback) -> bool {
        let outcome = self.run(message, state).await;
        finish(NAME, "Batch transfer stopped", outcome, callback)
    }
}
